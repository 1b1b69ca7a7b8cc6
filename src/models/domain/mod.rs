pub mod exam_result;
pub mod organization;
pub mod price;
pub mod progress;
pub mod user;
pub use exam_result::ExamResult;
pub use organization::{Exam, ExamProductCategory, Organization, SuggestedBook};
pub use price::{ExamPrices, PriceRecord};
pub use progress::InProgressExam;
pub use user::{SubscriptionInfo, User};

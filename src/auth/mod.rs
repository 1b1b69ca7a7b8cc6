pub mod claims;
pub mod manager;
pub mod session;
pub mod token;
pub mod utils;

pub use claims::{PaidExamIds, TokenPayload};
pub use manager::SessionManager;
pub use session::{AuthState, MasqueradeAs, MasqueradeMode, Session};
pub use token::decode_token_payload;
pub use utils::{decode_html_entities, has_exam_access};

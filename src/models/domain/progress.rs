use serde::{Deserialize, Serialize};

/// An exam the current user started but has not submitted, detected from a
/// durable `exam_progress_<examId>_<userId>` key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InProgressExam {
    pub exam_id: String,
    pub exam_name: String,
}

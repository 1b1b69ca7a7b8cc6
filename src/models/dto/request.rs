use serde::Serialize;

use crate::models::domain::ExamResult;

/// Body of `POST /user-results`: the results this device holds for the user,
/// for the server to merge with its own copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResultsRequest<'a> {
    pub user_id: &'a str,
    pub results: &'a [ExamResult],
}

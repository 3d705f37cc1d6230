//! Index constituents.

use tracing::debug;
use volcurve_types::{SecurityId, VolcurveError};

use crate::{Fetcher, Message, Request, RequestKind, ResponseReducer};

/// Bulk field listing an index's members.
pub const INDEX_MEMBERS_FIELD: &str = "INDX_MEMBERS";

/// Market sector suffix appended to each member ticker.
pub const DEFAULT_MEMBER_SUFFIX: &str = " Equity";

const SECURITY_DATA: &str = "securityData";
const FIELD_DATA: &str = "fieldData";

/// Parameters of an index-members request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembersRequest {
    /// Index identifier (e.g., "NKY Index").
    pub index: SecurityId,
    /// Suffix appended to every member ticker.
    pub suffix: String,
}

impl MembersRequest {
    /// Creates a request using [`DEFAULT_MEMBER_SUFFIX`].
    #[must_use]
    pub fn new(index: impl Into<SecurityId>) -> Self {
        Self {
            index: index.into(),
            suffix: DEFAULT_MEMBER_SUFFIX.to_string(),
        }
    }

    /// Replaces the member suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Builds the gateway request.
    #[must_use]
    pub fn to_request(&self) -> Request {
        let mut request = Request::new(RequestKind::ReferenceData);
        request
            .append("securities", self.index.as_str())
            .append("fields", INDEX_MEMBERS_FIELD);
        request
    }
}

#[derive(Debug)]
struct MembersReducer {
    suffix: String,
    members: Vec<SecurityId>,
}

impl ResponseReducer for MembersReducer {
    type Output = Vec<SecurityId>;

    fn accept(&mut self, message: &Message) -> Result<(), VolcurveError> {
        for security_data in message.root().get_element(SECURITY_DATA)?.values() {
            let field = security_data
                .get_element(FIELD_DATA)?
                .get_element(INDEX_MEMBERS_FIELD)?;

            if !field.is_array() {
                self.members
                    .push(SecurityId::new(field.to_text() + &self.suffix));
                continue;
            }

            // Row 0 is the column header.
            for row in field.values().skip(1) {
                for column in row.elements() {
                    self.members
                        .push(SecurityId::new(column.to_text() + &self.suffix));
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<SecurityId>, VolcurveError> {
        debug!(members = self.members.len(), "resolved index members");
        Ok(self.members)
    }
}

impl Fetcher {
    /// Resolves the members of an index.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails, the gateway reports an error,
    /// or the members field is missing.
    pub async fn index_members(&self, request: &MembersRequest) -> Result<Vec<SecurityId>, VolcurveError> {
        let reducer = MembersReducer {
            suffix: request.suffix.clone(),
            members: Vec::new(),
        };
        self.execute(request.to_request(), reducer).await
    }
}

use common::UserRef;

/// Builder for constructing order queries.
///
/// Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by owning user.
    pub user_ref: Option<UserRef>,

    /// Filter by status name, compared ignoring case.
    pub status: Option<String>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new query matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for the orders of one user.
    pub fn for_user(user_ref: impl Into<UserRef>) -> Self {
        Self {
            user_ref: Some(user_ref.into()),
            ..Default::default()
        }
    }

    /// Filters by owning user.
    pub fn user_ref(mut self, user_ref: impl Into<UserRef>) -> Self {
        self.user_ref = Some(user_ref.into());
        self
    }

    /// Filters by status. The name is stored upper case, e.g. `PAID`.
    pub fn status(mut self, status: impl AsRef<str>) -> Self {
        self.status = Some(status.as_ref().trim().to_ascii_uppercase());
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips a number of results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let query = OrderQuery::for_user("u-1").status("PAID").limit(10).offset(5);

        assert_eq!(query.user_ref, Some(UserRef::from("u-1")));
        assert_eq!(query.status.as_deref(), Some("PAID"));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn test_status_is_upper_cased() {
        let query = OrderQuery::new().status(" paid ");
        assert_eq!(query.status.as_deref(), Some("PAID"));
    }

    #[test]
    fn test_default_query_is_unfiltered() {
        let query = OrderQuery::new();
        assert!(query.user_ref.is_none());
        assert!(query.status.is_none());
        assert!(query.limit.is_none());
        assert!(query.offset.is_none());
    }
}

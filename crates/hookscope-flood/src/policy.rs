/// Which neighbouring contexts a query may be posted to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetPolicy {
    /// Post to every neighbour (the `*` target origin).
    #[default]
    Any,
    /// Post only to neighbours whose address has one of these origins.
    /// Neighbours without an address are skipped.
    AllowList(Vec<String>),
}

impl TargetPolicy {
    /// Parses `*` or a comma-separated list of origins.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "*" {
            return Self::Any;
        }
        Self::AllowList(
            value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(|origin| origin.trim_end_matches('/').to_string())
                .collect(),
        )
    }

    pub fn allows(&self, address: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::AllowList(origins) => address
                .and_then(origin_of)
                .is_some_and(|origin| origins.iter().any(|allowed| allowed == origin)),
        }
    }
}

/// `scheme://authority` prefix of an absolute URL.
pub fn origin_of(address: &str) -> Option<&str> {
    let scheme_end = address.find("://")?;
    let authority_start = scheme_end + 3;
    let authority_len = address[authority_start..]
        .find(['/', '?', '#'])
        .unwrap_or(address.len() - authority_start);
    if authority_len == 0 {
        return None;
    }
    Some(&address[..authority_start + authority_len])
}

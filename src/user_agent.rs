//! User-Agent string shared by the ticket and export clients.

/// Product token sent on every request to the visualization server.
const PRODUCT: &str = "viz-export";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (trusted-ticket exporter)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_product_and_version() {
        let ua = default_user_agent();
        let version = ua
            .strip_prefix("viz-export/")
            .and_then(|rest| rest.split(' ').next());
        assert_eq!(version, Some(env!("CARGO_PKG_VERSION")), "unexpected UA: {ua}");
    }
}

use std::collections::HashMap;

use yellowstone_grpc_proto::geyser::{
    CommitmentLevel, SubscribeRequest, SubscribeRequestFilterTransactions, SubscribeRequestPing,
};

use crate::streaming::common::{TRANSACTIONS_FILTER_NAME, WATCHED_ACCOUNT};

/// The one filter sent on every subscription: transactions touching the watched account
pub fn transactions_subscribe_request() -> SubscribeRequest {
    let mut transactions = HashMap::new();
    transactions.insert(
        TRANSACTIONS_FILTER_NAME.to_string(),
        SubscribeRequestFilterTransactions {
            account_include: vec![WATCHED_ACCOUNT.to_string()],
            ..Default::default()
        },
    );

    SubscribeRequest {
        transactions,
        commitment: Some(CommitmentLevel::Processed as i32),
        ..Default::default()
    }
}

/// Keepalive reply for server pings; leaves the active filter untouched
pub fn ping_request() -> SubscribeRequest {
    SubscribeRequest { ping: Some(SubscribeRequestPing { id: 1 }), ..Default::default() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_exactly_one_named_filter() {
        let request = transactions_subscribe_request();
        assert_eq!(request.transactions.len(), 1);
        let filter = &request.transactions[TRANSACTIONS_FILTER_NAME];
        assert_eq!(filter.account_include, vec![WATCHED_ACCOUNT.to_string()]);
        assert!(filter.account_exclude.is_empty());
        assert!(request.accounts.is_empty());
        assert!(request.slots.is_empty());
        assert!(request.ping.is_none());
    }

    #[test]
    fn ping_request_has_no_filters() {
        let request = ping_request();
        assert!(request.transactions.is_empty());
        assert_eq!(request.ping.map(|p| p.id), Some(1));
    }
}

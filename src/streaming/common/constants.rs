// Constants related to stream processing

// Default configuration constants
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
pub const DEFAULT_CHANNEL_SIZE: usize = 100;
pub const DEFAULT_MAX_DECODING_MESSAGE_SIZE: usize = 1024 * 1024 * 10;
pub const DEFAULT_BENCH_DURATION_SECS: u64 = 5 * 60;

// Subscription filter
pub const TRANSACTIONS_FILTER_NAME: &str = "alltxs";
// Pump.fun program, busy enough to produce a steady flow of shared transactions
pub const WATCHED_ACCOUNT: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

// Metadata key carrying the provider access token
pub const X_TOKEN_HEADER: &str = "x-token";

// Scratch record files, one per provider
pub const FIRST_STORE_FILE: &str = "txs_0.txt";
pub const SECOND_STORE_FILE: &str = "txs_1.txt";

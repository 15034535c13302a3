use env_logger::Env;

/// 預設只輸出 warn 以上的 log，避免打斷進度條；可用 `RUST_LOG` 覆寫
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .try_init();
}

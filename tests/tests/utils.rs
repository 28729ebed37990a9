use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("loadcheck=debug,mock_service=debug")
            .with_test_writer()
            .init();
    });
}

/// Start a mock service on the current test's runtime and return its base URL.
#[allow(unused)]
pub async fn mock_base() -> String {
    init();
    let addr: SocketAddr = mock_service::spawn().await.unwrap();
    format!("http://{addr}")
}

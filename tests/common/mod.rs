//! Shared test setup: a `tracing` subscriber so `RUST_LOG=substep=trace`
//! surfaces the stepper's per-substep spans while running these tests.

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}

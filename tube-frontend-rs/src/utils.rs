pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(all(target_arch = "wasm32", feature = "console_error_panic_hook"))]
    console_error_panic_hook::set_once();
}

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[cfg(target_arch = "wasm32")]
static LOGGER: std::sync::LazyLock<()> = std::sync::LazyLock::new(|| {
    set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

/// Route `log` output to the browser console. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init_browser_logging() {
    std::sync::LazyLock::force(&LOGGER);
}

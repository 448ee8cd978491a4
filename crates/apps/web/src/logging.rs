use std::io;

use wasm_bindgen::JsValue;

/// Forwards formatted log lines to the browser console.
struct ConsoleWriter;

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        web_sys::console::log_1(&JsValue::from_str(line.trim_end()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs the global subscriber. No timestamps: wall-clock time is not
/// available to `std` on wasm32.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_writer(|| ConsoleWriter)
        .without_time()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

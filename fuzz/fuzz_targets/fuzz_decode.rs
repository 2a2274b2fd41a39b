#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(event) = hotlist_core::event::decode(data) {
        let _ = event.tag("HOTLISTED");
    }
});

#![no_main]
use encrypted_cookie::{Cookie, CookieConfig};
use libfuzzer_sys::fuzz_target;

// unserialize must absorb any input without panicking or erroring.
fuzz_target!(|data: &[u8]| {
    for config in [
        CookieConfig::new(),
        CookieConfig::secure(),
        CookieConfig {
            compress_cookie: false,
            quote_base64: false,
            ..CookieConfig::secure()
        },
    ] {
        let _ = Cookie::unserialize(data, b"fuzz key".to_vec(), &config);
    }
});

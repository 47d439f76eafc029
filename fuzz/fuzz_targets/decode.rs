#![no_main]
use company_id_token::{Codec, Config};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = Codec::new(&Config::new(b"random-key"));
    let input = String::from_utf8_lossy(data);
    if let Some(id) = codec.decode(&input) {
        assert_eq!(codec.encode(id).ok().as_deref(), Some(&*input.to_lowercase()));
    }
    let _ = codec.resolve(&input);
});

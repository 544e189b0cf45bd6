use honggfuzz::fuzz;
use tablesweep::ConfigKey;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Ok(text) = std::str::from_utf8(data) {
                if let Ok(key) = text.parse::<ConfigKey>() {
                    let again: ConfigKey = key.to_string().parse().unwrap();
                    assert_eq!(again, key);
                }
            }
        });
    }
}

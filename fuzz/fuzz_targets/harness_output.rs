use honggfuzz::fuzz;
use tablesweep::{Dataset, HarnessOutput};

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            let text = String::from_utf8_lossy(data);
            if let Ok(output) = HarnessOutput::parse(&text, 7, b',') {
                let columns = output.header.len();
                assert!(output.rows.iter().all(|(_, fields)| fields.len() == columns));
                let mut dataset = Dataset::new();
                let rows = output.rows.len();
                if let Ok(added) = dataset.append(7, output) {
                    assert_eq!(added, rows);
                    assert!(dataset.rows().iter().all(|r| r.bit_width == 7));
                }
            }
        });
    }
}

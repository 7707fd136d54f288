#![no_main]

use chrono::{TimeZone, Utc};
use flowtrace::config::FlowConfig;
use flowtrace::event::{parse_timestamp, RawChangeRecord};
use flowtrace::row::{ItemMetadata, RowAssembler};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither path may panic, whatever the timestamps or ordering
        let _ = parse_timestamp(input);

        if let Ok(changelog) = serde_json::from_str::<Vec<RawChangeRecord>>(input) {
            let config = FlowConfig::default();
            if let chrono::LocalResult::Single(now) = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0) {
                let row = RowAssembler::new(&config, now).assemble_raw(
                    "FUZZ-1",
                    &changelog,
                    &ItemMetadata::default(),
                );
                assert!(row.blocked_days >= 0);
                assert!(row.metrics.flow_efficiency >= 0.0);
            }
        }
    }
});

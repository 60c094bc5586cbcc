use std::fs::{self, File};
use std::io::Write;

use joypart::config::ProfileConfig;
use schemars::schema_for;

const SCHEMA_DIR: &str = "./rootfs/usr/share/joypart/schema";

fn main() {
    let profile_schema = schema_for!(ProfileConfig);
    fs::create_dir_all(SCHEMA_DIR).expect("Failed to create schema directory");
    let mut file = File::create(format!("{SCHEMA_DIR}/device_profile_v1.json"))
        .expect("Failed to create schema file");
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&profile_schema).unwrap()
    )
    .expect("Failed to write schema");
}

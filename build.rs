const OVERRIDES: [&str; 3] = [
    "SENSOR_POLL_INTERVAL_MS",
    "SENSOR_SCAN_INTERVAL_MS",
    "SENSOR_UNIT",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in OVERRIDES {
        println!("cargo:rerun-if-env-changed={key}");
    }

    // Values from the environment win over the ones in .env
    let Ok(entries) = dotenvy::from_filename_iter(".env") else {
        return;
    };
    for (key, value) in entries.flatten() {
        if OVERRIDES.contains(&key.as_str()) && std::env::var(&key).is_err() {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}

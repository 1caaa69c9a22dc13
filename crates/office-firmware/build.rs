fn main() {
    // Expose WIFI_* / MQTT_* from a local .env as compile-time variables
    println!("cargo:rerun-if-changed=.env");
    if let Err(e) = dotenv_build::output(dotenv_build::Config::default()) {
        println!("cargo:warning=failed to load .env: {e}");
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed=AUTHBOX_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=AUTHBOX_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=AUTHBOX_CONTROL_URL");
    println!("cargo:rerun-if-env-changed=AUTHBOX_TOOL_NAME");

    // Host builds (tests, simulation) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

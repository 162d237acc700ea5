use std::env;

fn main() {
    // Vehicle identity defaults, applied when the parameter store is built.
    // Values left unset fall back to the parameter defaults.

    // MAVLink system id (MAV_SYS_ID)
    if let Ok(sys_id) = env::var("WARDEN_SYS_ID") {
        println!("cargo:rustc-env=WARDEN_SYS_ID={}", sys_id);
        println!("cargo:warning=Using WARDEN_SYS_ID from environment: {}", sys_id);
    } else {
        println!("cargo:rustc-env=WARDEN_SYS_ID=");
    }

    // MAVLink component id (MAV_COMP_ID)
    if let Ok(comp_id) = env::var("WARDEN_COMP_ID") {
        println!("cargo:rustc-env=WARDEN_COMP_ID={}", comp_id);
        println!("cargo:warning=Using WARDEN_COMP_ID from environment: {}", comp_id);
    } else {
        println!("cargo:rustc-env=WARDEN_COMP_ID=");
    }

    // Airframe class (MAV_TYPE)
    if let Ok(mav_type) = env::var("WARDEN_MAV_TYPE") {
        println!("cargo:rustc-env=WARDEN_MAV_TYPE={}", mav_type);
        println!("cargo:warning=Using WARDEN_MAV_TYPE from environment: {}", mav_type);
    } else {
        println!("cargo:rustc-env=WARDEN_MAV_TYPE=");
    }

    println!("cargo:rerun-if-env-changed=WARDEN_SYS_ID");
    println!("cargo:rerun-if-env-changed=WARDEN_COMP_ID");
    println!("cargo:rerun-if-env-changed=WARDEN_MAV_TYPE");
}

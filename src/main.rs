use rtlboot_lib::transport::list_ports;
use tracing::info;

fn main() {
    tracing_subscriber::fmt().with_target(false).without_time().init();

    info!("Listing serial ports...");

    match list_ports() {
        Ok(ports) => {
            for (count, (name, description)) in ports.iter().enumerate() {
                info!("Port #{}: {} ({})", count + 1, name, description);
            }
            if ports.is_empty() {
                info!("No serial ports found.");
            } else {
                info!("Pass one of these to rtl-dump / rtl-keys with -p");
            }
        }
        Err(e) => {
            eprintln!("Error listing serial ports: {:?}", e);
        }
    }
}

use embassy_net::Runner;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{
    AuthMethod,
    ClientConfig,
    ModeConfig,
    WifiController,
    WifiDevice,
    WifiEvent,
    WifiStaState,
};
use office_core::WifiConfig;

/// Background task for connecting to the `WiFi` network
///
/// It connects to the `WiFi` network and waits for the connection to be established.
/// If the connection is lost, it tries to reconnect.
#[embassy_executor::task]
pub(crate) async fn wifi_connection_task(
    mut controller: WifiController<'static>,
    wifi: &'static WifiConfig,
) {
    log::info!("network: connecting to {}", wifi.ssid);
    loop {
        // Wait until we're no longer connected
        if esp_radio::wifi::sta_state() == WifiStaState::Connected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            log::warn!("network: disconnected from {}", wifi.ssid);
            Timer::after(Duration::from_millis(2000)).await;
        }
        // Start the controller if it's not started
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = if wifi.password.is_empty() {
                ClientConfig::default()
                    .with_ssid(wifi.ssid.into())
                    .with_auth_method(AuthMethod::None)
            } else {
                ClientConfig::default()
                    .with_ssid(wifi.ssid.into())
                    .with_password(wifi.password.into())
            };
            controller
                .set_config(&ModeConfig::Client(client_config))
                .unwrap();
            controller.start_async().await.unwrap();
        }

        if let Err(e) = controller.connect_async().await {
            log::error!("network: failed to connect: {:?}", e);
            Timer::after(Duration::from_millis(5000)).await;
        }
    }
}

/// Background task for running the network stack
#[embassy_executor::task]
pub(crate) async fn network_runner_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

#![no_std]
#![no_main]

mod config;
mod infrastructure;

use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use office_core::{Node, NodePins};

use crate::infrastructure::adapters::{Link, MqttTransport, SharedLink, SystemClock};
use crate::infrastructure::drivers::{init_network_stack, wait_for_connection};
use crate::infrastructure::tasks::{network_runner_task, wifi_connection_task};

esp_bootloader_esp_idf::esp_app_desc!();

const TCP_BUF_SIZE: usize = 1024;

// static_cell::make_static! in main causes a compiler error
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize hardware
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap for the radio driver
    esp_alloc::heap_allocator!(size: 72 * 1024);

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Lights come up off before anything touches the network
    let pins = NodePins {
        sensor: Input::new(motion_gpio!(peripherals), InputConfig::default()),
        switch1: Input::new(
            switch1_gpio!(peripherals),
            InputConfig::default().with_pull(Pull::Down),
        ),
        switch2: Input::new(
            switch2_gpio!(peripherals),
            InputConfig::default().with_pull(Pull::Down),
        ),
        light1: Output::new(light1_gpio!(peripherals), Level::Low, OutputConfig::default()),
        light2: Output::new(light2_gpio!(peripherals), Level::Low, OutputConfig::default()),
    };

    // Initialize network stack and spawn network tasks
    let wifi = &config::NODE.wifi;
    let (stack, runner, controller) = init_network_stack(peripherals.WIFI, wifi);
    spawner.spawn(wifi_connection_task(controller, wifi)).ok();
    spawner.spawn(network_runner_task(runner)).ok();

    let ip = wait_for_connection(stack).await;
    log::info!("network: connected, address {}", ip.address);

    let rx_buffer = mk_static!([u8; TCP_BUF_SIZE], [0; TCP_BUF_SIZE]);
    let tx_buffer = mk_static!([u8; TCP_BUF_SIZE], [0; TCP_BUF_SIZE]);
    let socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
    let link = mk_static!(SharedLink, Mutex::new(Link::new(socket)));
    let transport = MqttTransport::new(stack, link);

    let mut node = Node::new(&config::NODE, pins, transport, SystemClock, Delay);
    node.run().await
}

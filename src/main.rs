// ====================================================================================
// src/main.rs - 应用入口 (终端宿主的订座页面)
// ====================================================================================
use seat_booking_client::{
    api::{HttpSeatApi, SeatApi},
    clock::SystemClock,
    config::Config,
    models::PassengerInfo,
    page::SeatBookingPage,
    view::{LoggingNavigator, LoggingSeatView, SeatActivation, TracingNotifier},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志记录
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "seat_booking_client=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env()?;
    tracing::info!(
        "订座页面启动，服务端: {}，班次: {}，用户: {} {}",
        config.api_base_url,
        config.schedule_id,
        config.current_user_id,
        config.current_username
    );

    let api = Arc::new(HttpSeatApi::new(&config)?);

    // 用余座接口确定座位数量
    let availability = match api.seat_availability(config.schedule_id).await {
        Ok(availability) => availability,
        Err(e) => {
            tracing::error!("无法获取班次 {} 的座位信息: {}", config.schedule_id, e);
            return Err(e.into());
        }
    };
    tracing::info!(
        "班次 {} 共 {} 个座位，可用 {}",
        config.schedule_id,
        availability.total_seats,
        availability.available_count
    );

    let view = Arc::new(LoggingSeatView::new((1..=availability.total_seats).collect()));
    let page = SeatBookingPage::new(
        &config,
        api,
        view.clone(),
        Arc::new(SystemClock),
        Arc::new(TracingNotifier),
        Arc::new(LoggingNavigator { base_url: site_root(&config.api_base_url) }),
    );
    page.mount();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["select", seat] | ["s", seat] => match seat.parse() {
                Ok(seat) => page.on_seat_activated(seat).await,
                Err(_) => tracing::warn!("无效的座位号: {}", seat),
            },
            ["book", name, email, phone] => {
                let passenger = PassengerInfo {
                    name: name.to_string(),
                    email: email.to_string(),
                    phone: phone.to_string(),
                };
                if page.on_submit(&passenger).await.is_some() {
                    break;
                }
            }
            ["cancel", booking_id] => match booking_id.parse() {
                Ok(id) => {
                    page.on_cancel_booking(id).await;
                }
                Err(_) => tracing::warn!("无效的预订号: {}", booking_id),
            },
            ["hide"] => page.on_visibility_changed(false),
            ["show"] => page.on_visibility_changed(true),
            ["blur"] => page.on_focus_changed(false),
            ["focus"] => page.on_focus_changed(true),
            ["status"] => {
                page.sync().render_latest();
                for render in view.current() {
                    println!("{:>4} {:<15} {}", render.name, render.css_class(), render.label);
                }
                println!("已选: {:?}", page.selection().selected_seats());
            }
            ["quit"] | ["exit"] => break,
            [] => {}
            _ => println!("命令: select N | book NAME EMAIL PHONE | cancel ID | hide | show | blur | focus | status | quit"),
        }
    }

    page.teardown();
    tracing::info!("订座页面已关闭");
    Ok(())
}

// http://host/api -> http://host
fn site_root(api_base_url: &str) -> String {
    api_base_url
        .trim_end_matches('/')
        .trim_end_matches("/api")
        .to_string()
}

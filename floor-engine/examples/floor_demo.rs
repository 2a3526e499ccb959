//! Floor Demo - 在进程内跑一遍状态同步、优先级评分和桌台推荐
//!
//! Run: cargo run -p floor-engine --example floor_demo

use floor_engine::{Config, FloorEngine, SeatingPreferences, StatusUpdateEvent, SubscriptionFilter, UpdateSource};
use shared::models::{DiningTable, ServiceOrder, ServicePriority, TableStatus};
use shared::util::now_millis;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 环境与日志
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    floor_engine::init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    // 2. 初始化引擎并载入楼面快照
    let mut engine = FloorEngine::initialize(config)?;
    engine.start_background_tasks();

    let now = now_millis();
    let mut vip = DiningTable::new("V1", 8, "VIP Room").with_priority(ServicePriority::High);
    vip.status = TableStatus::Dining;
    vip.dining_start_time = Some(now - 40 * 60_000);
    engine.refresh_tables(vec![
        DiningTable::new("A1", 2, "hall"),
        DiningTable::new("A2", 4, "hall").with_status(TableStatus::Cleaning),
        DiningTable::new("T1", 4, "terrace").with_status(TableStatus::Dining),
        vip,
    ]);

    // 3. 后厨视图只关心 KDS 事件
    let kitchen = engine.bus().subscribe(
        "kitchen-view",
        |event: &StatusUpdateEvent| {
            tracing::info!(table_id = %event.table_id, status = %event.new_status, "Kitchen view refresh");
            Ok(())
        },
        Some(SubscriptionFilter::sources([UpdateSource::KitchenDisplay])),
    );

    engine.bus().update_from_floor_management("", "A1", TableStatus::Seated, None);
    engine.bus().update_from_order_entry("o-100", "A1", TableStatus::Ordered, None);
    engine.bus().update_from_kitchen_display("o-100", "A1", TableStatus::WaitingFood, None);

    // 4. 优先级
    let orders = vec![
        ServiceOrder::new("o-100", now - 12 * 60_000).at_table("A1"),
        ServiceOrder::new("o-101", now - 3 * 60_000)
            .at_table("V1")
            .with_note("Client meeting, one guest has a nut allergy"),
    ];
    for score in engine.score_orders(&orders) {
        println!(
            "{:<6} total={:>3} level={:?} reasons={:?}",
            score.order_id, score.total, score.level, score.reasons
        );
    }

    // 5. 推荐
    let result = engine.recommend(
        3,
        &SeatingPreferences {
            preferred_zone: Some("hall".into()),
            ..Default::default()
        },
    );
    for rec in &result.recommendations {
        println!(
            "{:<4} score={:.2} {:?} wait={}m {:?}",
            rec.table.id, rec.score, rec.suitability, rec.estimated_wait, rec.reasons
        );
    }
    println!("estimated wait: {}m, actions: {:?}", result.estimated_wait, result.suggested_actions);

    kitchen.unsubscribe();
    engine.shutdown().await;
    Ok(())
}

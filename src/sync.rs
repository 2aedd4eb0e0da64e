// ====================================================================================
// src/sync.rs - 座位状态同步服务
// ====================================================================================
use crate::{
    api::SeatApi,
    clock::Clock,
    error::AppResult,
    models::{ScheduleId, SeatAvailability, UserId},
    render,
    snapshot::SeatSnapshot,
    view::SeatView,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

pub type SharedSnapshot = Option<Arc<SeatSnapshot>>;

#[derive(Debug, Default)]
struct PollState {
    // start() 被调用且尚未 stop()
    enabled: bool,
    hidden: bool,
    unfocused: bool,
    task: Option<JoinHandle<()>>,
}

impl PollState {
    fn should_run(&self) -> bool {
        self.enabled && !self.hidden && !self.unfocused
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

// 座位状态同步: 定时拉取快照并重绘座位视图
pub struct SeatStatusSync {
    api: Arc<dyn SeatApi>,
    view: Arc<dyn SeatView>,
    clock: Arc<dyn Clock>,
    schedule_id: ScheduleId,
    current_user_id: UserId,
    seats_per_row: u32,
    interval: Duration,
    snapshot_tx: watch::Sender<SharedSnapshot>,
    poll: Mutex<PollState>,
}

impl SeatStatusSync {
    pub fn new(
        api: Arc<dyn SeatApi>,
        view: Arc<dyn SeatView>,
        clock: Arc<dyn Clock>,
        schedule_id: ScheduleId,
        current_user_id: UserId,
        interval: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            api,
            view,
            clock,
            schedule_id,
            current_user_id,
            seats_per_row: 4,
            interval,
            snapshot_tx,
            poll: Mutex::new(PollState::default()),
        }
    }

    pub fn with_seats_per_row(mut self, seats_per_row: u32) -> Self {
        self.seats_per_row = seats_per_row;
        self
    }

    pub fn schedule_id(&self) -> ScheduleId {
        self.schedule_id
    }

    pub fn latest(&self) -> SharedSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn poll_state(&self) -> MutexGuard<'_, PollState> {
        self.poll.lock().unwrap_or_else(|e| e.into_inner())
    }

    // 启动定时刷新（立即刷新一次），重复调用无副作用
    pub fn start(self: &Arc<Self>) {
        let mut poll = self.poll_state();
        poll.enabled = true;
        self.reconcile(&mut poll);
    }

    pub fn stop(&self) {
        let mut poll = self.poll_state();
        poll.enabled = false;
        if let Some(task) = poll.task.take() {
            task.abort();
            tracing::info!("停止座位状态轮询，班次: {}", self.schedule_id);
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_state().is_running()
    }

    // 页面隐藏时暂停轮询，重新可见时恢复
    pub fn set_page_visible(self: &Arc<Self>, visible: bool) {
        let mut poll = self.poll_state();
        poll.hidden = !visible;
        self.reconcile(&mut poll);
    }

    pub fn set_page_focused(self: &Arc<Self>, focused: bool) {
        let mut poll = self.poll_state();
        poll.unfocused = !focused;
        self.reconcile(&mut poll);
    }

    fn reconcile(self: &Arc<Self>, poll: &mut PollState) {
        if poll.should_run() {
            if !poll.is_running() {
                poll.task = Some(self.spawn_poll_loop());
            }
        } else if let Some(task) = poll.task.take() {
            task.abort();
            tracing::debug!("暂停座位状态轮询，班次: {}", self.schedule_id);
        }
    }

    fn spawn_poll_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tracing::info!(
            "启动座位状态轮询，班次: {}，间隔: {:?}",
            self.schedule_id,
            self.interval
        );

        tokio::spawn(async move {
            let mut interval_timer = time::interval(this.interval);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // 第一次 tick 立即返回
                interval_timer.tick().await;
                let _ = this.refresh_once().await;
            }
        })
    }

    // 拉取一次快照；失败时保留旧快照，等下一次 tick 重试
    pub async fn refresh_once(&self) -> AppResult<Arc<SeatSnapshot>> {
        let response = match self.api.seat_status(self.schedule_id).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("获取座位状态失败，保留旧快照，班次: {}: {}", self.schedule_id, e);
                return Err(e);
            }
        };

        let snapshot = Arc::new(SeatSnapshot::from(response));
        let anomalies = snapshot.anomalies();
        if !anomalies.is_empty() {
            tracing::warn!(
                "座位状态快照不一致，班次: {}，问题: {:?}",
                self.schedule_id,
                anomalies
            );
        }

        self.snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));
        self.render(&snapshot);
        tracing::debug!(
            "座位状态已更新，班次: {}，可用 {}，已订 {}，临时 {}",
            self.schedule_id,
            snapshot.available_count(),
            snapshot.booked_count(),
            snapshot.temporary_count()
        );
        Ok(snapshot)
    }

    // 用最新快照重新渲染全部座位（倒计时按当前时间计算）
    pub fn render_latest(&self) {
        if let Some(snapshot) = self.latest() {
            self.render(&snapshot);
        }
    }

    fn render(&self, snapshot: &SeatSnapshot) {
        let seats = self.view.seat_ids();
        let renders = render::render_all(
            snapshot,
            &seats,
            self.current_user_id,
            self.clock.now(),
            self.seats_per_row,
        );
        self.view.apply(&renders);
    }

    pub async fn fetch_availability(&self) -> AppResult<SeatAvailability> {
        self.api.seat_availability(self.schedule_id).await
    }
}

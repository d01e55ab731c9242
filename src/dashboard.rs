//! Dashboard state: normalized collections, load lifecycle, filter and
//! selection state machines, and the reschedule workflow.
//!
//! `DashboardState` is headless: it owns data and transitions, and a shell
//! renders from it. Every mutation goes through a method so the invariants
//! (active filters only change on apply, one selection at a time, stale
//! refreshes discarded) hold by construction.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::gateway::{DashboardApi, GatewayError};
use crate::metrics::DashboardMetrics;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, BffClaims, Task};
use crate::normalize::{NormalizeContext, RawAppointment};
use crate::reschedule::{self, RescheduleForm, ReschedulePlan, ValidationError};
use crate::timefmt;

// ─── Load lifecycle ───────────────────────────────────────────────────────────

/// Where the last data load stands. `Failed` is distinguishable from an
/// empty `Ready` so the shell can show an error banner instead of an
/// empty-schedule placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

// ─── Selection ────────────────────────────────────────────────────────────────

/// What the user has open. A single value, so the detail drawer and the
/// reschedule modal can never be active at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Idle,
    /// Detail drawer open for this appointment.
    Viewing(String),
    /// Reschedule modal open for this appointment.
    Editing(String),
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RescheduleError {
    /// No appointment is in the editing state.
    #[error("No appointment selected for rescheduling")]
    NoActiveEdit,

    /// Recoverable form problem; the modal stays open with this message.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The BFF rejected or never received the mutation; nothing local
    /// changed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

// ─── DashboardState ───────────────────────────────────────────────────────────

pub struct DashboardState {
    ctx: NormalizeContext,
    token: String,
    appointments: Vec<Appointment>,
    tasks: Vec<Task>,
    load_state: LoadState,
    /// Bumped on every refresh start; completions carrying an older value
    /// are discarded.
    generation: u64,
    active_filter: AppointmentFilter,
    pending_filter: AppointmentFilter,
    filter_panel_open: bool,
    selection: Selection,
}

impl DashboardState {
    pub fn new(claims: &BffClaims, token: String) -> Self {
        Self {
            ctx: NormalizeContext::from(claims),
            token,
            appointments: Vec::new(),
            tasks: Vec::new(),
            load_state: LoadState::Idle,
            generation: 0,
            active_filter: AppointmentFilter::default(),
            pending_filter: AppointmentFilter::default(),
            filter_panel_open: false,
            selection: Selection::Idle,
        }
    }

    // ─── Accessors ────────────────────────────────────────────────────────

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn active_filter(&self) -> &AppointmentFilter {
        &self.active_filter
    }

    pub fn pending_filter(&self) -> &AppointmentFilter {
        &self.pending_filter
    }

    pub fn filter_panel_open(&self) -> bool {
        self.filter_panel_open
    }

    /// Appointments passing the active filter, in start-time order.
    pub fn filtered(&self) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| self.active_filter.matches(a))
            .collect()
    }

    /// Metric cards always reflect the full collections, never the
    /// filtered view.
    pub fn metrics(&self, now: DateTime<Utc>) -> DashboardMetrics {
        DashboardMetrics::compute(&self.appointments, &self.tasks, now)
    }

    // ─── Refresh ──────────────────────────────────────────────────────────

    /// Load both collections, all-or-nothing. On failure the previous
    /// collections stay visible and the load state records the error.
    pub async fn refresh<A: DashboardApi + ?Sized>(&mut self, api: &A) -> bool {
        let generation = self.begin_refresh();
        let result = tokio::try_join!(
            api.fetch_appointments(&self.ctx, &self.token),
            api.fetch_tasks(&self.ctx, &self.token),
        );
        self.complete_refresh(generation, result)
    }

    /// Mark a load in flight and hand back its generation. Split from
    /// `complete_refresh` so shells driving their own executor can
    /// interleave loads and still get stale-response protection.
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.load_state = LoadState::Loading;
        self.generation
    }

    /// Apply a finished load. Returns false when the result was discarded
    /// (superseded by a newer refresh) or the load failed.
    pub fn complete_refresh(
        &mut self,
        generation: u64,
        result: Result<(Vec<Appointment>, Vec<Task>), GatewayError>,
    ) -> bool {
        if generation != self.generation {
            debug!(generation, "Discarding superseded refresh result");
            return false;
        }
        match result {
            Ok((appointments, tasks)) => {
                info!(
                    appointments = appointments.len(),
                    tasks = tasks.len(),
                    "Dashboard data loaded"
                );
                self.appointments = appointments;
                self.tasks = tasks;
                self.load_state = LoadState::Ready;
                true
            }
            Err(e) => {
                error!("Failed to load dashboard data: {e}");
                self.load_state = LoadState::Failed(e.to_string());
                false
            }
        }
    }

    // ─── Filters ──────────────────────────────────────────────────────────

    pub fn toggle_filter_panel(&mut self) {
        self.filter_panel_open = !self.filter_panel_open;
    }

    /// Stage criteria without touching the visible list.
    pub fn set_pending_filter(&mut self, filter: AppointmentFilter) {
        self.pending_filter = filter;
    }

    /// Promote the staged criteria and close the panel.
    pub fn apply_filters(&mut self) {
        self.active_filter = self.pending_filter.clone();
        self.filter_panel_open = false;
        debug!(
            active = self.active_filter.active_count(),
            "Filters applied"
        );
    }

    /// Reset both staged and active criteria to "show everything".
    pub fn clear_filters(&mut self) {
        self.active_filter = AppointmentFilter::default();
        self.pending_filter = AppointmentFilter::default();
    }

    // ─── Selection ────────────────────────────────────────────────────────

    /// Open the detail drawer. Ignored while the reschedule modal is up,
    /// or for an unknown id.
    pub fn open_drawer(&mut self, id: &str) {
        if matches!(self.selection, Selection::Editing(_)) {
            return;
        }
        if self.appointments.iter().any(|a| a.id == id) {
            self.selection = Selection::Viewing(id.to_string());
        }
    }

    /// Open the reschedule modal, closing the drawer if it was showing the
    /// same or another appointment. Only scheduled appointments can be
    /// rescheduled.
    pub fn begin_reschedule(&mut self, id: &str) {
        if matches!(self.selection, Selection::Editing(_)) {
            return;
        }
        let reschedulable = self
            .appointments
            .iter()
            .any(|a| a.id == id && a.status == AppointmentStatus::Scheduled);
        if reschedulable {
            self.selection = Selection::Editing(id.to_string());
        }
    }

    /// Close whatever is open.
    pub fn close_selection(&mut self) {
        self.selection = Selection::Idle;
    }

    // ─── Reschedule ───────────────────────────────────────────────────────

    /// Validate the form, submit the mutation, and splice the echoed
    /// record into the collection. On any error the collection, ordering,
    /// and selection are untouched so the modal can stay open.
    pub async fn submit_reschedule<A: DashboardApi + ?Sized>(
        &mut self,
        api: &A,
        form: &RescheduleForm,
        now: DateTime<Utc>,
    ) -> Result<(), RescheduleError> {
        let Selection::Editing(id) = self.selection.clone() else {
            return Err(RescheduleError::NoActiveEdit);
        };
        let plan = {
            let appointment = self
                .appointments
                .iter()
                .find(|a| a.id == id)
                .ok_or(RescheduleError::NoActiveEdit)?;
            let today = reschedule::local_today(appointment, now);
            reschedule::plan(appointment, form, today)?
        };

        let echoed = api
            .reschedule_appointment(&id, plan.new_start, plan.new_end, &form.reason, &self.token)
            .await?;

        self.apply_reschedule(&id, echoed, plan);
        self.selection = Selection::Idle;
        info!(appointment = %id, "Appointment rescheduled");
        Ok(())
    }

    /// Replace start/end/duration (and notes, when echoed) on the one
    /// record, then restore start-time ordering. The server's echo wins
    /// where it parses; the validated plan is the fallback.
    fn apply_reschedule(&mut self, id: &str, echoed: RawAppointment, plan: ReschedulePlan) {
        let Some(appointment) = self.appointments.iter_mut().find(|a| a.id == id) else {
            return;
        };
        let parse = |s: Option<String>| {
            s.and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };
        let new_start = parse(echoed.start_time).unwrap_or(plan.new_start);
        let new_end = parse(echoed.end_time).unwrap_or(plan.new_end);
        appointment.start_time = new_start;
        appointment.end_time = new_end;
        appointment.duration_minutes = timefmt::duration_minutes(new_start, new_end);
        if echoed.notes.is_some() {
            appointment.notes = echoed.notes;
        }
        self.appointments.sort_by_key(|a| a.start_time);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

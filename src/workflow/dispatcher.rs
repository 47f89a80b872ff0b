//! Executes the terminal action chosen by routing: create, track, split or
//! replace, with optional GPS enrichment on the create/track fast path.
//!
//! GPS acquisition is strictly bounded: on timeout or error the dispatch
//! proceeds without coordinates. A missing fix never fails the expense.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{GPS_MAX_AGE, GPS_TIMEOUT};
use crate::host::{ExpenseGateway, GeoOptions, Geolocator, SoundCue};
use crate::models::{
    ExpenseParams, GpsPoint, IouType, Participant, PreparedFile, ReplaceReceiptParams,
    SplitParams, WorkflowContext,
};
use crate::workflow::WorkflowError;

/// Which backend operation ran.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DispatchKind {
    Created,
    Tracked,
    Split,
    Replaced,
}

/// Record of the single dispatch performed for an attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchRecord {
    pub kind: DispatchKind,
    pub transaction_id: Uuid,
    /// Present only when location was granted and a fix arrived in time.
    pub gps: Option<GpsPoint>,
}

/// Drives the expense gateway for one capture attempt.
pub struct TransactionDispatcher<'a> {
    gateway: &'a dyn ExpenseGateway,
    geolocator: &'a dyn Geolocator,
    sound: &'a dyn SoundCue,
}

impl<'a> TransactionDispatcher<'a> {
    pub fn new(
        gateway: &'a dyn ExpenseGateway,
        geolocator: &'a dyn Geolocator,
        sound: &'a dyn SoundCue,
    ) -> Self {
        Self {
            gateway,
            geolocator,
            sound,
        }
    }

    /// Fast-path create or track. Track is chosen when the intent is Track
    /// and the attempt has a report; everything else creates an expense on
    /// the participant's chat. The amount starts at zero and is filled in by
    /// receipt scanning later.
    pub async fn create_or_track(
        &self,
        ctx: &WorkflowContext,
        receipt: PreparedFile,
        participant: Participant,
        location_granted: bool,
    ) -> Result<DispatchRecord, WorkflowError> {
        let gps = if location_granted {
            self.acquire_fix().await
        } else {
            None
        };

        let params = ExpenseParams {
            transaction_id: ctx.transaction_id,
            report_id: ctx.report.as_ref().map(|r| r.report_id.clone()),
            payer: ctx.payer.clone(),
            participant,
            receipt,
            amount: 0,
            draft: ctx.draft.clone(),
            gps,
        };

        self.sound.play_done();

        let kind = if ctx.iou_type == IouType::Track && ctx.report.is_some() {
            self.gateway
                .track_expense(params)
                .await
                .map_err(WorkflowError::DispatchFailed)?;
            DispatchKind::Tracked
        } else {
            self.gateway
                .create_expense(params)
                .await
                .map_err(WorkflowError::DispatchFailed)?;
            DispatchKind::Created
        };

        tracing::info!(
            transaction_id = %ctx.transaction_id,
            kind = ?kind,
            gps_attached = gps.is_some(),
            "Fast-path expense dispatched"
        );
        Ok(DispatchRecord {
            kind,
            transaction_id: ctx.transaction_id,
            gps,
        })
    }

    /// Fast-path split across the report's membership. Splits never consult
    /// the location gate, so there is no GPS work here.
    pub async fn split(
        &self,
        ctx: &WorkflowContext,
        receipt: PreparedFile,
        participants: Vec<Participant>,
    ) -> Result<DispatchRecord, WorkflowError> {
        let params = SplitParams {
            transaction_id: ctx.transaction_id,
            existing_chat_report_id: ctx.report.as_ref().map(|r| r.report_id.clone()),
            payer: ctx.payer.clone(),
            participants,
            receipt,
            draft: ctx.draft.clone(),
        };

        self.sound.play_done();
        self.gateway
            .split_expense(params)
            .await
            .map_err(WorkflowError::DispatchFailed)?;

        tracing::info!(transaction_id = %ctx.transaction_id, "Split bill dispatched");
        Ok(DispatchRecord {
            kind: DispatchKind::Split,
            transaction_id: ctx.transaction_id,
            gps: None,
        })
    }

    /// Replace the receipt on an existing transaction (edit flow).
    pub async fn replace(
        &self,
        ctx: &WorkflowContext,
        receipt: PreparedFile,
    ) -> Result<DispatchRecord, WorkflowError> {
        self.gateway
            .replace_receipt(ReplaceReceiptParams {
                transaction_id: ctx.transaction_id,
                receipt,
            })
            .await
            .map_err(WorkflowError::DispatchFailed)?;

        tracing::info!(transaction_id = %ctx.transaction_id, "Receipt replaced");
        Ok(DispatchRecord {
            kind: DispatchKind::Replaced,
            transaction_id: ctx.transaction_id,
            gps: None,
        })
    }

    /// Get a GPS fix inside the configured bound. The expense is created
    /// either way; a timeout or error only drops the coordinates.
    async fn acquire_fix(&self) -> Option<GpsPoint> {
        let options = GeoOptions {
            max_age: GPS_MAX_AGE,
            timeout: GPS_TIMEOUT,
        };
        match tokio::time::timeout(GPS_TIMEOUT, self.geolocator.current_position(&options)).await {
            Ok(Ok(position)) => Some(GpsPoint {
                lat: position.latitude,
                long: position.longitude,
            }),
            Ok(Err(e)) => {
                tracing::info!(error = %e, "Geolocation failed; dispatching without GPS");
                None
            }
            Err(_) => {
                tracing::info!("Geolocation timed out; dispatching without GPS");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::host::{GeoPosition, HostError};
    use crate::models::test_support::{context_with_report, prepared_file};
    use crate::models::ReplaceReceiptParams;

    #[derive(Default)]
    struct RecordingGateway {
        created: Mutex<Vec<ExpenseParams>>,
        tracked: Mutex<Vec<ExpenseParams>>,
        splits: Mutex<Vec<SplitParams>>,
        replaced: Mutex<Vec<ReplaceReceiptParams>>,
        fail: bool,
    }

    impl RecordingGateway {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ExpenseGateway for RecordingGateway {
        async fn create_expense(&self, params: ExpenseParams) -> Result<(), HostError> {
            if self.fail {
                return Err(HostError::Gateway("offline".into()));
            }
            self.created.lock().unwrap().push(params);
            Ok(())
        }

        async fn track_expense(&self, params: ExpenseParams) -> Result<(), HostError> {
            self.tracked.lock().unwrap().push(params);
            Ok(())
        }

        async fn split_expense(&self, params: SplitParams) -> Result<(), HostError> {
            self.splits.lock().unwrap().push(params);
            Ok(())
        }

        async fn replace_receipt(&self, params: ReplaceReceiptParams) -> Result<(), HostError> {
            self.replaced.lock().unwrap().push(params);
            Ok(())
        }
    }

    enum GeoBehavior {
        Fix(GeoPosition),
        Fail,
        Hang,
    }

    struct StubGeolocator {
        behavior: GeoBehavior,
        calls: AtomicUsize,
    }

    impl StubGeolocator {
        fn fix() -> Self {
            Self {
                behavior: GeoBehavior::Fix(GeoPosition {
                    latitude: 48.8584,
                    longitude: 2.2945,
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                behavior: GeoBehavior::Fail,
                calls: AtomicUsize::new(0),
            }
        }

        fn hanging() -> Self {
            Self {
                behavior: GeoBehavior::Hang,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geolocator for StubGeolocator {
        async fn current_position(&self, _options: &GeoOptions) -> Result<GeoPosition, HostError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                GeoBehavior::Fix(position) => Ok(*position),
                GeoBehavior::Fail => Err(HostError::Permission("gps off".into())),
                GeoBehavior::Hang => {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    unreachable!("hanging geolocator should be timed out")
                }
            }
        }
    }

    struct CountingSound(AtomicUsize);

    impl SoundCue for CountingSound {
        fn play_done(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sound() -> CountingSound {
        CountingSound(AtomicUsize::new(0))
    }

    #[tokio::test]
    async fn granted_fix_attaches_gps() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::fix();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Submit);
        let participant = ctx.report.as_ref().unwrap().participants[0].clone();
        let record = dispatcher
            .create_or_track(&ctx, prepared_file(), participant, true)
            .await
            .unwrap();

        assert_eq!(record.kind, DispatchKind::Created);
        assert!(record.gps.is_some());
        let created = gateway.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].gps.unwrap().lat, 48.8584);
        assert_eq!(created[0].amount, 0);
        assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_location_never_calls_geolocator() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::fix();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Submit);
        let participant = ctx.report.as_ref().unwrap().participants[0].clone();
        let record = dispatcher
            .create_or_track(&ctx, prepared_file(), participant, false)
            .await
            .unwrap();

        assert!(record.gps.is_none());
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
        assert!(gateway.created.lock().unwrap()[0].gps.is_none());
    }

    #[tokio::test]
    async fn geolocation_error_still_dispatches() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::failing();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Submit);
        let participant = ctx.report.as_ref().unwrap().participants[0].clone();
        let record = dispatcher
            .create_or_track(&ctx, prepared_file(), participant, true)
            .await
            .unwrap();

        assert_eq!(record.kind, DispatchKind::Created);
        assert!(record.gps.is_none());
        assert_eq!(gateway.created.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn geolocation_timeout_still_dispatches() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::hanging();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Submit);
        let participant = ctx.report.as_ref().unwrap().participants[0].clone();
        let record = dispatcher
            .create_or_track(&ctx, prepared_file(), participant, true)
            .await
            .unwrap();

        assert!(record.gps.is_none());
        assert_eq!(gateway.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn track_intent_with_report_tracks() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::fix();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Track);
        let participant = ctx.report.as_ref().unwrap().participants[0].clone();
        let record = dispatcher
            .create_or_track(&ctx, prepared_file(), participant, false)
            .await
            .unwrap();

        assert_eq!(record.kind, DispatchKind::Tracked);
        assert_eq!(gateway.tracked.lock().unwrap().len(), 1);
        assert!(gateway.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn split_carries_all_participants_and_no_gps() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::fix();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let mut ctx = context_with_report(IouType::Split);
        ctx.report
            .as_mut()
            .unwrap()
            .participants
            .push(Participant::person(303, "third@example.com"));
        let participants = ctx.report.as_ref().unwrap().participants.clone();

        let record = dispatcher
            .split(&ctx, prepared_file(), participants)
            .await
            .unwrap();

        assert_eq!(record.kind, DispatchKind::Split);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
        let splits = gateway.splits.lock().unwrap();
        assert_eq!(splits[0].participants.len(), 2);
        assert_eq!(splits[0].existing_chat_report_id.as_deref(), Some("r100"));
        assert_eq!(cue.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replace_targets_the_transaction() {
        let gateway = RecordingGateway::default();
        let geo = StubGeolocator::fix();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Submit);
        let record = dispatcher.replace(&ctx, prepared_file()).await.unwrap();

        assert_eq!(record.kind, DispatchKind::Replaced);
        let replaced = gateway.replaced.lock().unwrap();
        assert_eq!(replaced[0].transaction_id, ctx.transaction_id);
        // No completion chime for a silent replace.
        assert_eq!(cue.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gateway_failure_is_dispatch_failed() {
        let gateway = RecordingGateway::failing();
        let geo = StubGeolocator::fix();
        let cue = sound();
        let dispatcher = TransactionDispatcher::new(&gateway, &geo, &cue);

        let ctx = context_with_report(IouType::Submit);
        let participant = ctx.report.as_ref().unwrap().participants[0].clone();
        let err = dispatcher
            .create_or_track(&ctx, prepared_file(), participant, false)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DispatchFailed(_)));
    }
}

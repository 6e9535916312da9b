//! Participant name and team editing.

use uuid::Uuid;

use super::{
    binding::{BatchWriter, Sent},
    identity::ParticipantIdentity,
    local_store::LocalResult,
};
use crate::state::transaction::{EntrantPatch, Transaction};

/// Name and team editor for the participant's entrant in one race.
///
/// Every edit is cached locally first, then written to the store as an
/// update touching only the edited field. Values are not validated.
/// Updates go through the view's [`BatchWriter`], so they are stored in the
/// order they were made.
#[derive(Clone)]
pub struct ProfilePanel {
    entrant_id: Uuid,
    identity: ParticipantIdentity,
    writer: BatchWriter,
}

impl ProfilePanel {
    /// Editor for `entrant_id`, writing through `writer`.
    pub fn new(entrant_id: Uuid, identity: ParticipantIdentity, writer: BatchWriter) -> Self {
        Self {
            entrant_id,
            identity,
            writer,
        }
    }

    /// Cached display name, empty when never set.
    pub fn name(&self) -> LocalResult<String> {
        self.identity.name()
    }

    /// Cached team label, empty when never set.
    pub fn team(&self) -> LocalResult<String> {
        self.identity.team()
    }

    /// Cache `name` and queue it for the store.
    pub fn set_name(&self, name: &str) -> LocalResult<Sent> {
        self.identity.set_name(name)?;
        Ok(self.send(EntrantPatch {
            name: Some(name.to_owned()),
            ..EntrantPatch::default()
        }))
    }

    /// Cache `team` and queue it for the store.
    pub fn set_team(&self, team: &str) -> LocalResult<Sent> {
        self.identity.set_team(team)?;
        Ok(self.send(EntrantPatch {
            team: Some(team.to_owned()),
            ..EntrantPatch::default()
        }))
    }

    fn send(&self, patch: EntrantPatch) -> Sent {
        self.writer
            .send(Transaction::new().update_entrant(self.entrant_id, patch))
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use futures::stream::{self, BoxStream};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        client::{
            binding::{ClientError, RaceStoreClient},
            local_store::MemoryLocalStore,
        },
        dto::race::RaceSnapshot,
        state::transaction::TxOp,
    };

    #[derive(Default)]
    struct RecordingClient {
        batches: Mutex<Vec<Transaction>>,
    }

    impl RaceStoreClient for RecordingClient {
        fn subscribe(&self, _race_id: Uuid) -> BoxStream<'static, RaceSnapshot> {
            Box::pin(stream::empty())
        }

        fn transact(&self, tx: Transaction) -> BoxFuture<'static, Result<(), ClientError>> {
            self.batches.lock().unwrap().push(tx);
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn team_edit_writes_only_the_team() {
        let client = Arc::new(RecordingClient::default());
        let identity = ParticipantIdentity::new(Arc::new(MemoryLocalStore::new()));
        let entrant_id = Uuid::new_v4();
        let panel = ProfilePanel::new(
            entrant_id,
            identity.clone(),
            BatchWriter::spawn(client.clone()),
        );

        panel.set_team("Blue").unwrap().await.unwrap();

        assert_eq!(identity.team().unwrap(), "Blue");
        let batches = client.batches.lock().unwrap();
        assert_eq!(
            batches[0].ops(),
            &[TxOp::UpdateEntrant {
                id: entrant_id,
                patch: EntrantPatch {
                    team: Some("Blue".into()),
                    ..EntrantPatch::default()
                },
            }]
        );
    }

    #[tokio::test]
    async fn empty_name_is_sent_as_is() {
        let client = Arc::new(RecordingClient::default());
        let identity = ParticipantIdentity::new(Arc::new(MemoryLocalStore::new()));
        let panel = ProfilePanel::new(
            Uuid::new_v4(),
            identity,
            BatchWriter::spawn(client.clone()),
        );

        panel.set_name("").unwrap().await.unwrap();

        let batches = client.batches.lock().unwrap();
        let TxOp::UpdateEntrant { patch, .. } = &batches[0].ops()[0] else {
            panic!("expected an entrant update");
        };
        assert_eq!(patch.name.as_deref(), Some(""));
        assert_eq!(patch.team, None);
    }
}

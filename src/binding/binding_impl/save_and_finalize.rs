#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// One write was issued and acknowledged.
    Written,
    /// The binding's fetch failed; it will never write.
    Suppressed,
    /// The host environment disables saving.
    DisabledByEnvironment,
}

/// What a save did with each sub-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub status: SaveStatus,
    /// Encoded at the latest version and written.
    pub written: Vec<String>,
    /// Written back verbatim because they never decoded.
    pub preserved: Vec<String>,
    /// Left out of this write (mixed key types or serializer error).
    pub dropped: Vec<String>,
}

impl SaveReport {
    fn new(status: SaveStatus) -> Self {
        Self {
            status,
            written: Vec::new(),
            preserved: Vec::new(),
            dropped: Vec::new(),
        }
    }

    pub fn is_written(&self) -> bool {
        self.status == SaveStatus::Written
    }
}

impl DataBinding {
    pub async fn save(&self) -> Result<SaveReport> {
        self.save_with(|_, _| {}).await
    }

    /// Saves and then calls `on_complete(binding, write_succeeded)`.
    ///
    /// The hook only runs when a write was actually issued; suppressed,
    /// disabled and not-yet-retrieved saves return before that point.
    pub async fn save_with<F>(&self, on_complete: F) -> Result<SaveReport>
    where
        F: FnOnce(&DataBinding, bool) + Send,
    {
        if !self.saving_enabled {
            event!(Level::DEBUG, key = %self.context.master_key, "saving disabled in this environment");
            return Ok(SaveReport::new(SaveStatus::DisabledByEnvironment));
        }

        {
            let state = self.state();
            if state.suppress_save {
                event!(Level::DEBUG, key = %self.context.master_key, "save suppressed after failed fetch");
                return Ok(SaveReport::new(SaveStatus::Suppressed));
            }
            if state.retrieval != RetrievalState::Retrieved {
                warn!(
                    "save refused before retrieval: store='{}' key='{}'",
                    self.context.store_name, self.context.master_key
                );
                return Err(BindError::NotRetrieved(self.context.master_key.clone()));
            }
        }

        let span = info_span!(
            "binding.save",
            store = %self.context.store_name,
            key = %self.context.master_key
        );
        self.write_master_record(on_complete).instrument(span).await
    }

    /// Final save; on success the binding leaves the registry. A failed
    /// finalize keeps it registered so the next autosave tick retries.
    pub async fn finalize(&self) -> Result<SaveReport> {
        let registry = self.registry.clone();
        self.save_with(move |binding, succeeded| {
            if !succeeded {
                return;
            }
            if let Some(registry) = registry.upgrade() {
                registry.unregister(binding.id());
            }
        })
        .await
    }

    async fn write_master_record<F>(&self, on_complete: F) -> Result<SaveReport>
    where
        F: FnOnce(&DataBinding, bool) + Send,
    {
        let _in_flight = self.save_gate.lock().await;

        let mut report = SaveReport::new(SaveStatus::Written);
        let mut aggregate = Table::new();

        for slot in &self.slots {
            let sub_key = slot.sub_key();
            if !slot.is_retrieved() {
                if let Some(raw) = slot.undecoded() {
                    aggregate.insert(sub_key, raw);
                    report.preserved.push(sub_key.to_string());
                    continue;
                }
            }

            let record = match slot.encode().await {
                Ok(record) => record,
                Err(err) => {
                    event!(Level::WARN, sub_key = sub_key, error = %err, "sub-record serialize failed, dropped from save");
                    report.dropped.push(sub_key.to_string());
                    continue;
                }
            };

            if let Some(violation) = find_mixed_table(&record) {
                event!(
                    Level::WARN,
                    sub_key = sub_key,
                    path = %violation.path_string(),
                    "sub-record mixes index and name keys, dropped from save"
                );
                report.dropped.push(sub_key.to_string());
                continue;
            }

            aggregate.insert(sub_key, record);
            report.written.push(sub_key.to_string());
        }

        let master = Table::new().with(self.context.master_key.as_str(), aggregate);
        let result = self.store.put_record(&self.context.master_key, &master).await;

        match result {
            Ok(()) => {
                {
                    let mut state = self.state();
                    state.saves_written += 1;
                    state.last_saved_at = Some(Utc::now());
                }
                event!(Level::DEBUG, written = report.written.len(), "master record saved");
                on_complete(self, true);
                Ok(report)
            }
            Err(err) => {
                self.state().save_failures += 1;
                event!(Level::WARN, error = %err, "master record write failed");
                on_complete(self, false);
                Err(err)
            }
        }
    }
}

impl DataBinding {
    /// Fetches the master record unless a fetch already completed or is
    /// still running. Returns `true` when this call's result was applied.
    pub async fn fetch(&self) -> bool {
        match self.begin_fetch(false) {
            Some(generation) => self.run_fetch(generation).await,
            None => false,
        }
    }

    /// Fetches again regardless of state. A fetch still in flight is
    /// superseded and its result discarded when it arrives.
    pub async fn refetch(&self) -> bool {
        match self.begin_fetch(true) {
            Some(generation) => self.run_fetch(generation).await,
            None => false,
        }
    }

    fn begin_fetch(&self, bypass: bool) -> Option<u64> {
        let mut state = self.state();
        if !bypass {
            if state.retrieval == RetrievalState::Retrieved {
                warn!(
                    "fetch ignored, binding already retrieved: store='{}' key='{}'",
                    self.context.store_name, self.context.master_key
                );
                return None;
            }
            if state.fetch_in_flight {
                warn!(
                    "fetch ignored, another fetch is in flight: store='{}' key='{}'",
                    self.context.store_name, self.context.master_key
                );
                return None;
            }
        }

        state.fetch_generation += 1;
        state.fetch_in_flight = true;
        Some(state.fetch_generation)
    }

    fn is_current_fetch(&self, generation: u64) -> bool {
        self.state().fetch_generation == generation
    }

    async fn run_fetch(&self, generation: u64) -> bool {
        let span = info_span!(
            "binding.fetch",
            store = %self.context.store_name,
            key = %self.context.master_key,
            generation = generation
        );
        self.fetch_and_decode(generation).instrument(span).await
    }

    async fn fetch_and_decode(&self, generation: u64) -> bool {
        let (mut record, failed) = match self.store.get_record(&self.context.master_key).await {
            Ok(record) => (record.unwrap_or_default(), false),
            Err(err) => {
                event!(
                    Level::WARN,
                    error = %err,
                    "master record fetch failed, saving suppressed for this binding"
                );
                (Table::new(), true)
            }
        };

        if !self.is_current_fetch(generation) {
            event!(Level::DEBUG, "superseded fetch result discarded");
            return false;
        }
        if failed {
            self.state().suppress_save = true;
        }

        let mut master = record
            .remove_table(&self.context.master_key)
            .unwrap_or_default();

        // Each sub-record decodes on its own; one failure leaves the rest intact.
        for slot in &self.slots {
            let stored = master.remove_table(slot.sub_key()).unwrap_or_default();
            match slot.decode(stored, &self.context).await {
                Ok(tag) => {
                    event!(Level::DEBUG, sub_key = slot.sub_key(), version = %tag, "sub-record decoded")
                }
                Err(err) => {
                    event!(Level::WARN, sub_key = slot.sub_key(), error = %err, "sub-record decode failed")
                }
            }
        }

        {
            let mut state = self.state();
            if state.fetch_generation != generation {
                return false;
            }
            state.retrieval = RetrievalState::Retrieved;
            state.fetch_in_flight = false;
            state.fetches_completed += 1;
            state.last_fetched_at = Some(Utc::now());
        }

        self.retrieved_tx.send_replace(true);
        event!(Level::INFO, "binding retrieved");

        if let Some(hook) = &self.on_loaded {
            hook(self, self.parent.as_ref());
        }
        true
    }
}

/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Ephemeral in-memory implementation of [ReadModelFacade].

use crate::InMemStoreProvider;
use crossbeam_skiplist::map::Entry;
use std::sync::Arc;
use toolgate_store::model::GatewayError;
use toolgate_store::provider::facades::ReadModelFacade;

/// Ephemeral in-memory implementation of [ReadModelFacade].
pub struct InMemReadModelFacade {
    inmem_provider: Arc<InMemStoreProvider>,
}

impl InMemReadModelFacade {
    /// Return a new instance.
    pub fn new(inmem_provider: &Arc<InMemStoreProvider>) -> Self {
        Self {
            inmem_provider: Arc::clone(inmem_provider),
        }
    }
}

#[async_trait::async_trait]
impl ReadModelFacade for InMemReadModelFacade {
    async fn document_upsert(
        &self,
        collection: &str,
        document_id: &str,
        document: &str,
    ) -> Result<(), GatewayError> {
        self.inmem_provider
            .collection_by_name(collection)
            .value()
            .insert(document_id.to_owned(), document.to_owned());
        Ok(())
    }

    async fn document_by_id(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        Ok(self
            .inmem_provider
            .collection_by_name(collection)
            .value()
            .get(document_id)
            .as_ref()
            .map(Entry::value)
            .cloned())
    }

    async fn document_delete(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), GatewayError> {
        self.inmem_provider
            .collection_by_name(collection)
            .value()
            .remove(document_id);
        Ok(())
    }

    async fn documents_by_collection(
        &self,
        collection: &str,
    ) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .inmem_provider
            .collection_by_name(collection)
            .value()
            .iter()
            .map(|entry| entry.value().to_owned())
            .collect())
    }

    async fn checkpoint_store(
        &self,
        projection_id: &str,
        checkpoint: u64,
    ) -> Result<(), GatewayError> {
        self.inmem_provider
            .checkpoints
            .insert(projection_id.to_owned(), checkpoint);
        Ok(())
    }

    async fn checkpoint_by_projection(
        &self,
        projection_id: &str,
    ) -> Result<Option<u64>, GatewayError> {
        Ok(self
            .inmem_provider
            .checkpoints
            .get(projection_id)
            .as_ref()
            .map(Entry::value)
            .copied())
    }
}

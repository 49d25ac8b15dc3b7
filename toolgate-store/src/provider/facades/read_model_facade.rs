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

//! Store facade for the denormalized read model.

use crate::model::GatewayError;

/// Store facade for the denormalized read model.
///
/// Documents are serialized JSON, keyed by collection and identifier. The
/// projector is the only writer of document collections; queries only read.
#[async_trait::async_trait]
pub trait ReadModelFacade: Send + Sync {
    /// Insert or replace a document.
    async fn document_upsert(
        &self,
        collection: &str,
        document_id: &str,
        document: &str,
    ) -> Result<(), GatewayError>;

    /// Get a document by identifier.
    async fn document_by_id(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<String>, GatewayError>;

    /// Delete a document. Deleting a missing document is a no-op.
    async fn document_delete(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), GatewayError>;

    /// Get all documents of a collection ordered by identifier.
    async fn documents_by_collection(&self, collection: &str)
    -> Result<Vec<String>, GatewayError>;

    /// Durably store a projection checkpoint.
    async fn checkpoint_store(
        &self,
        projection_id: &str,
        checkpoint: u64,
    ) -> Result<(), GatewayError>;

    /// Load a projection checkpoint stored earlier.
    async fn checkpoint_by_projection(
        &self,
        projection_id: &str,
    ) -> Result<Option<u64>, GatewayError>;
}

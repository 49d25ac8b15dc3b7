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

//! Store Provider abstraction

pub mod facades;

use self::facades::*;
use std::sync::Arc;

/// The Store Provider.
///
/// Implementation logic is abstracted by [StoreProviderFacades] for related
/// operations.
pub struct StoreProvider {
    facades: Box<Arc<dyn StoreProviderFacades>>,
}

impl StoreProvider {
    /// Return a new instance.
    pub fn new(store_provider_facades: Arc<dyn StoreProviderFacades>) -> Self {
        Self {
            facades: Box::new(store_provider_facades),
        }
    }
}

impl StoreProviderFacades for StoreProvider {
    fn event_journal_facade(&self) -> &dyn EventJournalFacade {
        self.facades.event_journal_facade()
    }

    fn read_model_facade(&self) -> &dyn ReadModelFacade {
        self.facades.read_model_facade()
    }

    fn cache_facade(&self) -> &dyn CacheFacade {
        self.facades.cache_facade()
    }
}

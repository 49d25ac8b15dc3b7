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

//! Store facades.

mod cache_facade;
mod event_journal_facade;
mod read_model_facade;

pub use self::cache_facade::*;
pub use self::event_journal_facade::*;
pub use self::read_model_facade::*;

/// Provide access to store facades.
pub trait StoreProviderFacades: Send + Sync {
    /// See [EventJournalFacade].
    fn event_journal_facade(&self) -> &dyn EventJournalFacade;

    /// See [ReadModelFacade].
    fn read_model_facade(&self) -> &dyn ReadModelFacade;

    /// See [CacheFacade].
    fn cache_facade(&self) -> &dyn CacheFacade;
}

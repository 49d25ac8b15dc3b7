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

//! Event-sourced domain aggregates.
//!
//! Each aggregate is the fold of its event stream. Command methods are pure
//! deciders: they validate business rules against the folded state and emit
//! events without touching any store.

pub mod event_types;

mod group_aggregate;
mod policy_aggregate;
mod source_aggregate;

pub use self::group_aggregate::GroupAggregate;
pub use self::policy_aggregate::PolicyAggregate;
pub use self::source_aggregate::SourceAggregate;

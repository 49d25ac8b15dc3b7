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

//! Time related utility functions.

/// Microseconds since UNIX epoch
pub fn get_timestamp_micros() -> u64 {
    u64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_micros(),
    )
    .unwrap()
}

/// Render an epoch microseconds timestamp as RFC 3339 in UTC.
pub fn as_rfc3339(epoch_micros: u64) -> String {
    chrono::DateTime::from_timestamp_micros(i64::try_from(epoch_micros).unwrap_or_default())
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc3339_rendering() {
        assert_eq!(as_rfc3339(0), "1970-01-01T00:00:00.000000Z");
        assert_eq!(as_rfc3339(1_700_000_000_000_000), "2023-11-14T22:13:20.000000Z");
    }
}

// Copyright 2025 ForkMonkey Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

/// Human readable label for a fork degree (BFS distance from the root).
///
/// Everything from 4 upwards takes a plain "th" suffix, including 11-13.
pub fn degree_label(degree: u32) -> String {
    match degree {
        0 => "root".to_string(),
        1 => "1st degree".to_string(),
        2 => "2nd degree".to_string(),
        3 => "3rd degree".to_string(),
        n => format!("{}th degree", n),
    }
}

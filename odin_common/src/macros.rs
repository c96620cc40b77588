/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

#[allow(unused_macros)]

/// macro to flatten nested "if let .." chains of fallible parse steps into a single block, e.g. when
/// a regex capture has to be converted field by field and any failing step should yield `None`
///
/// ```
/// use odin_common::if_let;
///
/// fn parse_hm (s: &str)->Option<(u32,u32)> {
///     if_let! {
///         Some((h,m)) = s.split_once(':'),
///         Ok(h) = h.parse::<u32>(),
///         Ok(m) = m.parse::<u32>() => {
///             return Some((h,m))
///         }
///     }
///     None
/// }
/// assert_eq!( parse_hm("12:30"), Some((12,30)));
/// assert_eq!( parse_hm("12-30"), None);
/// ```
/// which expands into
/// ```text
/// if let Some((h,m)) = s.split_once(':') {
///     if let Ok(h) = h.parse::<u32>() {
///         if let Ok(m) = m.parse::<u32>() {
///             return Some((h,m))
///         }
///     }
/// }
/// ```
/// An `else` block can be attached to a (block) match expression to provide side effects or a value for the failed match:
/// ```text
/// if_let! {
///     Some(cap) = { re.captures(name) } else { debug!("no match"); None },
///     Ok(n) = cap[1].parse::<u32>() => { Some(n) }
/// }
/// ```
#[macro_export]
macro_rules! if_let {
    //--- the leafs
    { $p:pat = $x:block else $e:block => $r:expr } => {
        if let $p = $x { $r } else $e
    };
    { $p:pat = $x:expr => $r:expr } => {
        if let $p = $x { $r }
    };

    //--- the recursive tt munchers
    { $p:pat = $x:block else $e:block , $($ts:tt)+ } => {
        if let $p = $x { $crate::if_let! { $($ts)+ } } else $e
    };
    { $p:pat = $x:expr , $($ts:tt)+ } => {
        if let $p = $x {
            $crate::if_let! { $($ts)+ }
        }
    };
}
pub use if_let; // preserve 'macros' module across crates

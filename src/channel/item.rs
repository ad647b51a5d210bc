// Copyright (c) 2024 Mike Tsao

use crate::{
    curve::Curves,
    error::{ensure_finite, Result},
    types::{CurveUid, ItemUid},
};
use serde::{Deserialize, Serialize};

/// What a [ChannelItem] plays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemSource {
    /// A flat value.
    Constant {
        #[allow(missing_docs)]
        value: f64,
    },
    /// A window into a curve. The curve is sampled at
    /// `local_time * speed + offset` and the result is scaled by `amp`.
    Curve {
        #[allow(missing_docs)]
        curve: CurveUid,
        /// Playback rate. Never negative.
        speed: f64,
        /// Curve time at the start of the item.
        offset: f64,
        /// Output scale.
        amp: f64,
    },
}
impl ItemSource {
    /// A curve source that plays the curve as drawn.
    pub fn curve(curve: CurveUid) -> Self {
        Self::Curve {
            curve,
            speed: 1.0,
            offset: 0.0,
            amp: 1.0,
        }
    }
}

/// One piece of a channel's timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelItem {
    #[allow(missing_docs)]
    pub uid: ItemUid,
    /// Start time on the channel.
    pub time: f64,
    /// Duration. Infinite for a constant item that nothing has come after
    /// yet.
    pub length: f64,
    /// For curve items: loop the curve instead of holding its last value
    /// once playback runs past its end.
    pub reset: bool,
    #[allow(missing_docs)]
    pub source: ItemSource,
}
impl ChannelItem {
    /// A constant item that lasts until something comes after it.
    pub fn new_constant(uid: ItemUid, time: f64, value: f64) -> Self {
        Self {
            uid,
            time,
            length: f64::INFINITY,
            reset: false,
            source: ItemSource::Constant { value },
        }
    }

    /// An item that plays `curve` once at normal speed.
    pub fn new_curve(uid: ItemUid, time: f64, curve: CurveUid, curve_length: f64) -> Self {
        Self {
            uid,
            time,
            length: curve_length,
            reset: false,
            source: ItemSource::curve(curve),
        }
    }

    /// The time the item stops.
    pub fn end(&self) -> f64 {
        self.time + self.length
    }

    /// Whether the item has a finite end.
    pub fn is_bounded(&self) -> bool {
        self.length.is_finite()
    }

    /// The curve this item plays, if it's a curve item.
    pub fn curve(&self) -> Option<CurveUid> {
        match self.source {
            ItemSource::Constant { .. } => None,
            ItemSource::Curve { curve, .. } => Some(curve),
        }
    }

    /// Evaluates the item `local_time` after its start. For curve items it
    /// also returns the curve time that was read and the curve's own value
    /// there.
    pub(crate) fn evaluate(&self, local_time: f64, curves: &Curves) -> (f64, Option<(f64, f64)>) {
        match self.source {
            ItemSource::Constant { value } => (value, None),
            ItemSource::Curve {
                curve,
                speed,
                offset,
                amp,
            } => {
                let Some(target) = curves.get(curve) else {
                    log::warn!("Item {} refers to missing curve {curve}", self.uid);
                    return (0.0, None);
                };
                let mut t = local_time.min(self.length) * speed + offset;
                let length = target.length();
                if self.reset && t > length {
                    t = t.rem_euclid(length);
                }
                let raw = target.value_at(t);
                (raw * amp, Some((t, raw)))
            }
        }
    }

    pub(crate) fn new_with_data(uid: ItemUid, data: &SerializedChannelItem) -> Result<Self> {
        let time = ensure_finite("item time", data.time)?;
        let length = match data.length {
            Some(length) => ensure_finite("item length", length)?.max(0.0),
            None => f64::INFINITY,
        };
        let source = match data.curve {
            Some(curve) => ItemSource::Curve {
                curve,
                speed: ensure_finite("item speed", data.speed.unwrap_or(1.0))?.max(0.0),
                offset: ensure_finite("item offset", data.offset.unwrap_or(0.0))?,
                amp: ensure_finite("item amp", data.amp.unwrap_or(1.0))?,
            },
            None => ItemSource::Constant {
                value: ensure_finite("item value", data.value.unwrap_or(0.0))?,
            },
        };
        Ok(Self {
            uid,
            time,
            length,
            reset: data.reset,
            source,
        })
    }

    pub(crate) fn serialize(&self) -> SerializedChannelItem {
        let mut data = SerializedChannelItem {
            time: self.time,
            length: self.is_bounded().then_some(self.length),
            reset: self.reset,
            ..Default::default()
        };
        match self.source {
            ItemSource::Constant { value } => data.value = Some(value),
            ItemSource::Curve {
                curve,
                speed,
                offset,
                amp,
            } => {
                data.curve = Some(curve);
                data.speed = Some(speed);
                data.offset = Some(offset);
                data.amp = Some(amp);
            }
        }
        data
    }
}

/// The saved form of a [ChannelItem]. An item with `curve` set is a curve
/// item; anything else is a constant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SerializedChannelItem {
    #[allow(missing_docs)]
    #[serde(default)]
    pub time: f64,
    /// Absent for an item that hasn't ended yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    /// Constant items only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub reset: bool,
    /// Curve items only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<CurveUid>,
    /// Curve items only. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Curve items only. Defaults to 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Curve items only. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{automaton::AutomatonContext, curve::Curve};
    use float_cmp::approx_eq;

    fn curves_with_ramp() -> (Curves, CurveUid) {
        let mut curves = Curves::default();
        let mut curve = Curve::new_with(AutomatonContext::default(), 2.0, 100.0).unwrap();
        let last = curve.node_by_index(1).unwrap().uid;
        curve.move_node_value(last, 1.0).unwrap();
        let uid = curves.insert(curve);
        (curves, uid)
    }

    #[test]
    fn constant_items() {
        let curves = Curves::default();
        let item = ChannelItem::new_constant(ItemUid(1), 1.0, 3.0);
        assert!(!item.is_bounded());
        assert_eq!(item.end(), f64::INFINITY);
        assert_eq!(item.evaluate(0.5, &curves), (3.0, None));
        assert!(item.curve().is_none());
    }

    #[test]
    fn curve_items_transform_playback() {
        let (curves, uid) = curves_with_ramp();
        let curve = curves.get(uid).unwrap();
        let mut item = ChannelItem::new_curve(ItemUid(1), 0.0, uid, 2.0);
        item.source = ItemSource::Curve {
            curve: uid,
            speed: 2.0,
            offset: 0.5,
            amp: 3.0,
        };
        let (value, preview) = item.evaluate(0.25, &curves);
        let (t, raw) = preview.unwrap();
        assert!(approx_eq!(f64, t, 1.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, raw, curve.value_at(1.0), epsilon = 1e-12));
        assert!(approx_eq!(f64, value, 3.0 * raw, epsilon = 1e-12));
    }

    #[test]
    fn reset_loops_instead_of_holding() {
        let (curves, uid) = curves_with_ramp();
        let curve = curves.get(uid).unwrap();
        let mut item = ChannelItem::new_curve(ItemUid(1), 0.0, uid, 10.0);
        let held = item.evaluate(2.5, &curves).0;
        assert!(approx_eq!(f64, held, curve.value_at(2.0), epsilon = 1e-12));

        item.reset = true;
        let looped = item.evaluate(2.5, &curves).0;
        assert!(approx_eq!(f64, looped, curve.value_at(0.5), epsilon = 1e-12));
    }

    #[test]
    fn missing_curve_evaluates_to_zero() {
        let curves = Curves::default();
        let item = ChannelItem::new_curve(ItemUid(1), 0.0, CurveUid(3), 1.0);
        assert_eq!(item.evaluate(0.5, &curves), (0.0, None));
    }

    #[test]
    fn serialized_shapes() {
        let constant = ChannelItem::new_constant(ItemUid(1), 1.0, 0.5);
        assert_eq!(
            serde_json::to_string(&constant.serialize()).unwrap(),
            r#"{"time":1.0,"value":0.5}"#
        );

        let curve = ChannelItem::new_curve(ItemUid(2), 0.0, CurveUid(4), 2.0);
        let data = curve.serialize();
        assert_eq!(
            serde_json::to_string(&data).unwrap(),
            r#"{"time":0.0,"length":2.0,"curve":4,"speed":1.0,"offset":0.0,"amp":1.0}"#
        );
        let back = ChannelItem::new_with_data(ItemUid(2), &data).unwrap();
        assert_eq!(back, curve);

        let sparse: SerializedChannelItem =
            serde_json::from_str(r#"{"time":1.5,"length":1,"curve":0}"#).unwrap();
        let item = ChannelItem::new_with_data(ItemUid(3), &sparse).unwrap();
        assert_eq!(item.source, ItemSource::curve(CurveUid(0)));
        assert_eq!(item.length, 1.0);
    }
}

// Copyright (c) 2024 Mike Tsao

use super::{ChannelItem, ItemSource, SerializedChannel};
use crate::{
    automaton::AutomatonContext,
    curve::Curves,
    error::{ensure_finite, AutomatonError, Result},
    status::{ChannelStatusCode, Status, StatusLevel, StatusList},
    traits::{HasStatus, Serializable},
    types::{CurveUid, ItemUid},
    util::{Emitter, SubscriptionId},
};
use strum_macros::EnumDiscriminants;

/// Gaps narrower than this don't count as room for [Channel::repeat_item()].
const REPEAT_EPSILON: f64 = 1e-4;

/// Everything a [Channel] tells its subscribers about.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ChannelEventKind), derive(Hash), allow(missing_docs))]
pub enum ChannelEvent {
    /// An item was added.
    CreateItem {
        #[allow(missing_docs)]
        uid: ItemUid,
        /// The item as it now stands.
        item: ChannelItem,
    },
    /// An item moved, resized, or changed what it plays.
    UpdateItem {
        #[allow(missing_docs)]
        uid: ItemUid,
        /// The item as it now stands.
        item: ChannelItem,
    },
    /// An item was removed.
    RemoveItem {
        #[allow(missing_docs)]
        uid: ItemUid,
    },
    /// The current value changed.
    ChangeValue {
        #[allow(missing_docs)]
        value: f64,
    },
    /// Playback state was thrown away and the value recomputed.
    Reset,
    /// The most severe diagnostic changed.
    UpdateStatus,
    /// The end of the last item moved.
    ChangeLength {
        #[allow(missing_docs)]
        length: f64,
    },
}

/// A timeline of [ChannelItem]s that produces one value at a time.
///
/// Items are kept sorted by start time and never overlap. An item covers
/// `[time, end]`; where one item ends exactly as the next begins, the later
/// one wins. Times no item covers evaluate to 0.
///
/// Curve items refer to curves by [CurveUid], so every operation that has to
/// read a curve (or adjust its user count) takes the automaton's [Curves].
#[derive(Debug)]
pub struct Channel {
    items: Vec<ChannelItem>,
    value: f64,
    time: f64,
    /// The number of items that start at or before `time`.
    head: usize,
    should_reset: bool,
    status: StatusList<ChannelStatusCode>,
    context: AutomatonContext,
    emitter: Emitter<ChannelEvent>,
}
impl Channel {
    /// An empty channel.
    pub fn new_with(context: AutomatonContext) -> Self {
        Self::new_from_items(context, Vec::default())
    }

    /// Loads a channel from saved data. Items get fresh uids, and every curve
    /// they refer to gains a user. Nothing changes if any item is invalid or
    /// refers to a missing curve.
    pub fn new_with_data(
        context: AutomatonContext,
        data: &SerializedChannel,
        curves: &mut Curves,
    ) -> Result<Self> {
        let mut items = Vec::with_capacity(data.items.len());
        for item_data in data.items.iter() {
            let item = ChannelItem::new_with_data(context.uid_factory.mint_next(), item_data)?;
            if let Some(curve) = item.curve() {
                curves.curve(curve)?;
            }
            items.push(item);
        }
        items.sort_by(|a, b| a.time.total_cmp(&b.time));
        for i in 1..items.len() {
            let start = items[i].time;
            let prev = &mut items[i - 1];
            prev.length = prev.length.min(start - prev.time);
        }
        for curve in items.iter().filter_map(ChannelItem::curve) {
            if let Some(curve) = curves.get_mut(curve) {
                curve.increment_user_count();
            }
        }
        let mut r = Self::new_from_items(context, items);
        r.reset(curves);
        Ok(r)
    }

    fn new_from_items(context: AutomatonContext, items: Vec<ChannelItem>) -> Self {
        let mut status = StatusList::default();
        status.set(Status::new_with(
            ChannelStatusCode::NotUsed,
            StatusLevel::Warning,
            "This channel has not been used yet",
        ));
        Self {
            items,
            value: 0.0,
            time: 0.0,
            head: 0,
            should_reset: false,
            status,
            context,
            emitter: Default::default(),
        }
    }

    /// The end of the last item, or 0 if there are none. Infinite if the
    /// last item is a constant that nothing has come after.
    pub fn length(&self) -> f64 {
        self.items.last().map_or(0.0, ChannelItem::end)
    }

    /// All items, sorted by start time.
    pub fn items(&self) -> &[ChannelItem] {
        &self.items
    }

    /// The value as of the last [Channel::update()].
    pub fn current_value(&self) -> f64 {
        self.value
    }

    /// The time of the last [Channel::update()].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Registers a handler for every event.
    pub fn subscribe(&mut self, handler: impl FnMut(&ChannelEvent) + 'static) -> SubscriptionId {
        self.emitter.subscribe(handler)
    }

    /// Registers a handler for one kind of event.
    pub fn subscribe_kind(
        &mut self,
        kind: ChannelEventKind,
        handler: impl FnMut(&ChannelEvent) + 'static,
    ) -> SubscriptionId {
        self.emitter.subscribe_kind(kind, handler)
    }

    /// Removes a handler.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn emit(&mut self, event_fn: impl FnOnce(&Self) -> ChannelEvent) {
        if self.emitter.subscriber_count() > 0 {
            let event = event_fn(self);
            self.emitter.emit(&event);
        }
    }

    fn item_event(&self, uid: ItemUid, is_create: bool) -> ChannelEvent {
        let item = self
            .try_item(uid)
            .cloned()
            .unwrap_or_else(|| ChannelItem::new_constant(uid, 0.0, 0.0));
        if is_create {
            ChannelEvent::CreateItem { uid, item }
        } else {
            ChannelEvent::UpdateItem { uid, item }
        }
    }

    /// Recomputes the value, reports the change, and reports the new length
    /// if it moved.
    fn commit(
        &mut self,
        curves: &Curves,
        length_before: f64,
        event_fn: impl FnOnce(&Self) -> ChannelEvent,
    ) {
        self.reset(curves);
        self.emit(event_fn);
        let length = self.length();
        if length != length_before {
            self.emitter.emit(&ChannelEvent::ChangeLength { length });
        }
        self.context.save_tracker.mark();
    }

    // Evaluation

    fn active_item(&self, head: usize, time: f64) -> Option<&ChannelItem> {
        head.checked_sub(1)
            .and_then(|i| self.items.get(i))
            .filter(|item| time <= item.end())
    }

    /// The channel's value at `time`, without touching playback state or
    /// telling curves what was read. Meant for editors that want to probe
    /// arbitrary times.
    pub fn value_from_gui(&self, time: f64, curves: &Curves) -> f64 {
        let head = self.items.partition_point(|item| item.time <= time);
        self.active_item(head, time)
            .map_or(0.0, |item| item.evaluate(time - item.time, curves).0)
    }

    fn advance_head(&mut self, time: f64) {
        while self
            .items
            .get(self.head)
            .is_some_and(|item| item.time <= time)
        {
            self.head += 1;
        }
    }

    /// Moves playback to `time` and recomputes the value. Seeking backward is
    /// fine. Curve items publish what they read to their curve as a preview.
    pub fn update(&mut self, time: f64, curves: &mut Curves) {
        let prev_value = self.value;
        if self.should_reset {
            self.should_reset = false;
            self.reset(curves);
        }
        if time < self.time || self.time.is_nan() {
            self.head = 0;
        }
        self.time = time;
        self.advance_head(time);

        let (value, preview) = match self.active_item(self.head, time) {
            Some(item) => {
                let (value, preview) = item.evaluate(time - item.time, curves);
                (value, item.curve().zip(preview))
            }
            None => (0.0, None),
        };
        if let Some((curve, (t, raw))) = preview {
            if let Some(curve) = curves.get_mut(curve) {
                curve.set_preview_time_value(t, raw);
            }
        }
        self.value = value;
        if prev_value != value {
            self.emitter.emit(&ChannelEvent::ChangeValue { value });
        }
    }

    /// Asks the next [Channel::update()] to [Channel::reset()] first. Use it
    /// after a discontinuous seek.
    pub fn cue_reset(&mut self) {
        self.should_reset = true;
    }

    /// Throws away playback state and recomputes the value at the current
    /// time.
    pub fn reset(&mut self, curves: &Curves) {
        let prev_value = self.value;
        self.head = 0;
        self.advance_head(self.time);
        self.value = self
            .active_item(self.head, self.time)
            .map_or(0.0, |item| item.evaluate(self.time - item.time, curves).0);
        self.emitter.emit(&ChannelEvent::Reset);
        if prev_value != self.value {
            self.emitter
                .emit(&ChannelEvent::ChangeValue { value: self.value });
        }
    }

    // Items

    /// The number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The `index`-th item in time order.
    pub fn item_by_index(&self, index: usize) -> Result<&ChannelItem> {
        self.items
            .get(index)
            .ok_or(AutomatonError::IndexOutOfRange {
                what: "item",
                index,
                count: self.items.len(),
            })
    }

    /// The item with this uid.
    pub fn item(&self, uid: ItemUid) -> Result<&ChannelItem> {
        self.try_item(uid).ok_or(AutomatonError::ItemNotFound(uid))
    }

    /// The item with this uid, if there is one.
    pub fn try_item(&self, uid: ItemUid) -> Option<&ChannelItem> {
        self.items.iter().find(|item| item.uid == uid)
    }

    fn item_index(&self, uid: ItemUid) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.uid == uid)
            .ok_or(AutomatonError::ItemNotFound(uid))
    }

    /// Whether this is the last item on the timeline.
    pub fn is_last_item(&self, uid: ItemUid) -> Result<bool> {
        Ok(self.item_index(uid)? == self.items.len() - 1)
    }

    fn sort_items(&mut self) {
        self.items.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Start of the next item, or infinity.
    fn right_bound(&self, index: usize) -> f64 {
        self.items.get(index + 1).map_or(f64::INFINITY, |next| next.time)
    }

    /// End of the previous item, or 0.
    fn left_bound(&self, index: usize) -> f64 {
        index
            .checked_sub(1)
            .and_then(|i| self.items.get(i))
            .map_or(0.0, ChannelItem::end)
    }

    /// Puts an item on the timeline. An earlier item that runs past the new
    /// one's start is cut short, and the new one is cut short of the item
    /// after it.
    fn insert_item(&mut self, mut item: ChannelItem, curves: &Curves) -> ChannelItem {
        let length_before = self.length();
        item.time = item.time.max(0.0);
        let index = self.items.partition_point(|i| i.time <= item.time);

        let mut trimmed = None;
        if let Some(prev) = index.checked_sub(1).and_then(|i| self.items.get_mut(i)) {
            if prev.end() > item.time {
                prev.length = item.time - prev.time;
                trimmed = Some(prev.uid);
            }
        }
        if let Some(next) = self.items.get(index) {
            item.length = item.length.min(next.time - item.time);
        }
        self.items.insert(index, item.clone());

        if let Some(prev) = trimmed {
            self.emit(|c| c.item_event(prev, false));
        }
        let uid = item.uid;
        self.commit(curves, length_before, |c| c.item_event(uid, true));
        item
    }

    fn claim_curve(curves: &mut Curves, item: &ChannelItem) -> Result<()> {
        if let Some(curve) = item.curve() {
            curves.curve_mut(curve)?.increment_user_count();
        }
        Ok(())
    }

    fn release_curve(curves: &mut Curves, item: &ChannelItem) {
        if let Some(curve) = item.curve().and_then(|c| curves.get_mut(c)) {
            curve.decrement_user_count();
        }
    }

    /// Adds a constant item with value 0 that lasts until something comes
    /// after it.
    pub fn create_item_constant(&mut self, time: f64, curves: &Curves) -> Result<ChannelItem> {
        let time = ensure_finite("item time", time)?;
        let item = ChannelItem::new_constant(self.context.uid_factory.mint_next(), time, 0.0);
        Ok(self.insert_item(item, curves))
    }

    /// Adds an item that plays `curve` once from its start.
    pub fn create_item_curve(
        &mut self,
        curve: CurveUid,
        time: f64,
        curves: &mut Curves,
    ) -> Result<ChannelItem> {
        let time = ensure_finite("item time", time)?;
        let curve_length = curves.curve(curve)?.length();
        let item = ChannelItem::new_curve(
            self.context.uid_factory.mint_next(),
            time,
            curve,
            curve_length,
        );
        Self::claim_curve(curves, &item)?;
        Ok(self.insert_item(item, curves))
    }

    /// Puts back an item that was removed earlier, keeping its uid.
    pub fn create_item_from_data(
        &mut self,
        item: ChannelItem,
        curves: &mut Curves,
    ) -> Result<ChannelItem> {
        Self::check_item(&item)?;
        if self.try_item(item.uid).is_some() {
            return Err(AutomatonError::DuplicateItem(item.uid));
        }
        Self::claim_curve(curves, &item)?;
        self.context
            .uid_factory
            .notify_externally_minted_uid(&item.uid);
        Ok(self.insert_item(item, curves))
    }

    /// Copies `source` to `time` under a new uid.
    pub fn duplicate_item(
        &mut self,
        time: f64,
        source: &ChannelItem,
        curves: &mut Curves,
    ) -> Result<ChannelItem> {
        let time = ensure_finite("item time", time)?;
        Self::check_item(source)?;
        let item = ChannelItem {
            uid: self.context.uid_factory.mint_next(),
            time,
            ..source.clone()
        };
        Self::claim_curve(curves, &item)?;
        Ok(self.insert_item(item, curves))
    }

    /// Copies an item into the first gap after it that's wide enough, or
    /// after the last item if there's no such gap.
    pub fn repeat_item(&mut self, uid: ItemUid, curves: &mut Curves) -> Result<ChannelItem> {
        let index = self.item_index(uid)?;
        let time = self.items[index..]
            .windows(2)
            .map(|pair| (pair[0].end(), pair[1].time))
            .find(|(left, right)| right - left > REPEAT_EPSILON)
            .map_or(self.length(), |(left, _)| left);
        if !time.is_finite() {
            return Err(AutomatonError::UnboundedItem(self.items[self.items.len() - 1].uid));
        }
        let source = self.items[index].clone();
        self.duplicate_item(time, &source, curves)
    }

    fn check_item(item: &ChannelItem) -> Result<()> {
        ensure_finite("item time", item.time)?;
        if item.length.is_nan() || item.length < 0.0 {
            return Err(AutomatonError::InvalidLength(item.length));
        }
        if let ItemSource::Curve {
            speed, offset, amp, ..
        } = item.source
        {
            ensure_finite("item speed", speed)?;
            ensure_finite("item offset", offset)?;
            ensure_finite("item amp", amp)?;
        }
        Ok(())
    }

    /// Removes an item.
    pub fn remove_item(&mut self, uid: ItemUid, curves: &mut Curves) -> Result<()> {
        let index = self.item_index(uid)?;
        let length_before = self.length();
        let item = self.items.remove(index);
        Self::release_curve(curves, &item);
        self.commit(curves, length_before, |_| ChannelEvent::RemoveItem { uid });
        Ok(())
    }

    /// Moves an item without letting it overlap its neighbors.
    pub fn move_item(&mut self, uid: ItemUid, time: f64, curves: &Curves) -> Result<()> {
        ensure_finite("item time", time)?;
        let index = self.item_index(uid)?;
        let length_before = self.length();
        let left = self.left_bound(index);
        let right = self.right_bound(index);
        let item = &mut self.items[index];
        // min() ignores the NaN that inf - inf gives an unbounded last item.
        item.time = time.min(right - item.length).max(left);
        self.sort_items();
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Puts an item at an exact time without checking its neighbors. Meant
    /// for replaying history, where the neighbors are being restored too.
    pub fn force_move_item(&mut self, uid: ItemUid, time: f64, curves: &Curves) -> Result<()> {
        ensure_finite("item time", time)?;
        let index = self.item_index(uid)?;
        let length_before = self.length();
        self.items[index].time = time;
        self.sort_items();
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Playback speed that keeps the same content when the length goes from
    /// `before` to `after`.
    fn stretched_speed(speed: f64, before: f64, after: f64) -> f64 {
        if before.is_finite() && after.is_finite() && before > 0.0 && after > 0.0 {
            speed * before / after
        } else {
            speed
        }
    }

    /// Changes an item's length, keeping its start. With `stretch`, a curve
    /// item's speed changes so that it plays the same stretch of curve.
    pub fn resize_item(
        &mut self,
        uid: ItemUid,
        length: f64,
        stretch: bool,
        curves: &Curves,
    ) -> Result<()> {
        ensure_finite("item length", length)?;
        let index = self.item_index(uid)?;
        let length_before = self.length();
        let right = self.right_bound(index);
        let item = &mut self.items[index];
        let prev_length = item.length;
        item.length = length.max(0.0).min(right - item.time);
        if stretch {
            if let ItemSource::Curve { ref mut speed, .. } = item.source {
                *speed = Self::stretched_speed(*speed, prev_length, item.length);
            }
        }
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Changes an item's length, keeping its end. Without `stretch`, a curve
    /// item's offset moves so that the curve stays put under the fixed end;
    /// with it, the speed changes instead.
    pub fn resize_item_by_left(
        &mut self,
        uid: ItemUid,
        length: f64,
        stretch: bool,
        curves: &Curves,
    ) -> Result<()> {
        ensure_finite("item length", length)?;
        let index = self.item_index(uid)?;
        if !self.items[index].is_bounded() {
            return Err(AutomatonError::UnboundedItem(uid));
        }
        let length_before = self.length();
        let left = self.left_bound(index);
        let item = &mut self.items[index];
        let prev_length = item.length;
        let end = item.end();
        item.length = length.max(0.0).min(end - left);
        item.time = end - item.length;
        let new_length = item.length;
        if let ItemSource::Curve {
            ref mut speed,
            ref mut offset,
            ..
        } = item.source
        {
            if stretch {
                *speed = Self::stretched_speed(*speed, prev_length, new_length);
            } else {
                let end_offset = prev_length * *speed + *offset;
                *offset = end_offset - new_length * *speed;
            }
        }
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Sets the value of a constant item.
    pub fn change_item_value(&mut self, uid: ItemUid, value: f64, curves: &Curves) -> Result<()> {
        ensure_finite("item value", value)?;
        let index = self.item_index(uid)?;
        match self.items[index].source {
            ItemSource::Constant { value: ref mut v } => *v = value,
            ItemSource::Curve { .. } => {
                return Err(AutomatonError::ItemKind {
                    uid,
                    expected: "constant",
                })
            }
        }
        let length_before = self.length();
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Sets whether a curve item loops.
    pub fn change_item_reset(&mut self, uid: ItemUid, reset: bool, curves: &Curves) -> Result<()> {
        let index = self.item_index(uid)?;
        self.items[index].reset = reset;
        let length_before = self.length();
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    fn curve_source_mut(&mut self, uid: ItemUid) -> Result<(&mut f64, &mut f64, &mut f64)> {
        let index = self.item_index(uid)?;
        match self.items[index].source {
            ItemSource::Curve {
                ref mut speed,
                ref mut offset,
                ref mut amp,
                ..
            } => Ok((speed, offset, amp)),
            ItemSource::Constant { .. } => Err(AutomatonError::ItemKind {
                uid,
                expected: "curve",
            }),
        }
    }

    /// Sets the speed and offset of a curve item. Negative speeds become 0.
    pub fn change_curve_speed_and_offset(
        &mut self,
        uid: ItemUid,
        speed: f64,
        offset: f64,
        curves: &Curves,
    ) -> Result<()> {
        ensure_finite("item speed", speed)?;
        ensure_finite("item offset", offset)?;
        let (s, o, _) = self.curve_source_mut(uid)?;
        *s = speed.max(0.0);
        *o = offset;
        let length_before = self.length();
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Sets the output scale of a curve item.
    pub fn change_curve_amp(&mut self, uid: ItemUid, amp: f64, curves: &Curves) -> Result<()> {
        ensure_finite("item amp", amp)?;
        let (_, _, a) = self.curve_source_mut(uid)?;
        *a = amp;
        let length_before = self.length();
        self.commit(curves, length_before, |c| c.item_event(uid, false));
        Ok(())
    }

    /// Fits the channel into a timeline of the given length. Items that
    /// start at or past it are removed and bounded items that cross it are
    /// shortened. Unbounded constant items are left alone.
    pub fn change_length(&mut self, length: f64, curves: &mut Curves) -> Result<()> {
        ensure_finite("channel length", length)?;
        let length_before = self.length();
        let mut events = Vec::default();

        let mut i = self.items.len();
        while i > 0 {
            i -= 1;
            let item = &mut self.items[i];
            if item.time >= length {
                let item = self.items.remove(i);
                Self::release_curve(curves, &item);
                events.push(ChannelEvent::RemoveItem { uid: item.uid });
            } else if item.is_bounded() && item.end() > length {
                item.length = length - item.time;
                events.push(ChannelEvent::UpdateItem {
                    uid: item.uid,
                    item: item.clone(),
                });
            }
        }
        if events.is_empty() {
            return Ok(());
        }

        self.reset(curves);
        for event in events {
            self.emitter.emit(&event);
        }
        let new_length = self.length();
        if new_length != length_before {
            self.emitter
                .emit(&ChannelEvent::ChangeLength { length: new_length });
        }
        self.context.save_tracker.mark();
        Ok(())
    }
}
impl HasStatus for Channel {
    type Code = ChannelStatusCode;

    fn status_list(&self) -> &StatusList<ChannelStatusCode> {
        &self.status
    }

    fn mark_as_used(&mut self) {
        if self
            .status
            .watch(|s| s.delete(ChannelStatusCode::NotUsed))
        {
            self.emitter.emit(&ChannelEvent::UpdateStatus);
        }
    }
}
impl Serializable for Channel {
    type Serialized = SerializedChannel;

    fn serialize(&self) -> SerializedChannel {
        SerializedChannel {
            items: self.items.iter().map(ChannelItem::serialize).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{curve::Curve, util::Rng};
    use float_cmp::approx_eq;
    use more_asserts::assert_le;
    use std::{cell::RefCell, rc::Rc};

    fn setup() -> (Channel, Curves, CurveUid) {
        let context = AutomatonContext::default();
        let mut curves = Curves::default();
        let mut ramp = Curve::new_with(context.clone(), 2.0, 100.0).unwrap();
        let last = ramp.node_by_index(1).unwrap().uid;
        ramp.move_node_value(last, 1.0).unwrap();
        let uid = curves.insert(ramp);
        (Channel::new_with(context), curves, uid)
    }

    fn record(channel: &mut Channel) -> Rc<RefCell<Vec<ChannelEventKind>>> {
        let log = Rc::new(RefCell::new(Vec::default()));
        let l = Rc::clone(&log);
        channel.subscribe(move |e| l.borrow_mut().push(ChannelEventKind::from(e)));
        log
    }

    fn assert_no_overlap(channel: &Channel) {
        for pair in channel.items().windows(2) {
            assert_le!(pair[0].time, pair[1].time, "items should be sorted");
            assert_le!(
                pair[0].end(),
                pair[1].time,
                "items {} and {} overlap",
                pair[0].uid,
                pair[1].uid
            );
        }
    }

    #[test]
    fn constant_items_scenario() {
        let (mut channel, mut curves, _) = setup();
        assert_eq!(channel.length(), 0.0);

        let a = channel.create_item_constant(0.0, &curves).unwrap().uid;
        assert_eq!(channel.length(), f64::INFINITY);
        channel.change_item_value(a, 1.0, &curves).unwrap();
        let b = channel.create_item_constant(2.0, &curves).unwrap().uid;
        channel.change_item_value(b, 3.0, &curves).unwrap();
        assert_eq!(channel.item(a).unwrap().length, 2.0, "a is trimmed");

        channel.update(1.0, &mut curves);
        assert_eq!(channel.current_value(), 1.0);
        channel.update(2.5, &mut curves);
        assert_eq!(channel.current_value(), 3.0);

        let log = record(&mut channel);
        channel.remove_item(b, &mut curves).unwrap();
        assert_eq!(channel.length(), 2.0);
        assert!(log.borrow().contains(&ChannelEventKind::ChangeLength));
        assert_eq!(channel.current_value(), 0.0, "2.5 is past the end now");
    }

    #[test]
    fn later_item_wins_at_boundaries_and_gaps_are_zero() {
        let (mut channel, mut curves, _) = setup();
        let a = channel.create_item_constant(0.0, &curves).unwrap().uid;
        channel.change_item_value(a, 1.0, &curves).unwrap();
        let b = channel.create_item_constant(1.0, &curves).unwrap().uid;
        channel.change_item_value(b, 2.0, &curves).unwrap();
        channel.resize_item(b, 1.0, false, &curves).unwrap();
        let c = channel.create_item_constant(3.0, &curves).unwrap().uid;
        channel.change_item_value(c, 3.0, &curves).unwrap();

        assert_eq!(channel.value_from_gui(1.0, &curves), 2.0);
        assert_eq!(channel.value_from_gui(2.0, &curves), 2.0);
        assert_eq!(channel.value_from_gui(2.5, &curves), 0.0);
        assert_eq!(channel.value_from_gui(-1.0, &curves), 0.0);
        channel.update(2.5, &mut curves);
        assert_eq!(channel.current_value(), 0.0);
        channel.update(3.0, &mut curves);
        assert_eq!(channel.current_value(), 3.0);
    }

    #[test]
    fn curve_items() {
        let (mut channel, mut curves, ramp) = setup();
        let item = channel.create_item_curve(ramp, 1.0, &mut curves).unwrap();
        assert_eq!(item.length, 2.0);
        assert_eq!(curves.get(ramp).unwrap().user_count(), 1);
        assert!(curves.get(ramp).unwrap().status().is_none());

        let expected = curves.get(ramp).unwrap().value_at(1.0);
        channel.update(2.0, &mut curves);
        assert!(approx_eq!(
            f64,
            channel.current_value(),
            expected,
            epsilon = 1e-12
        ));

        channel.change_curve_amp(item.uid, -2.0, &curves).unwrap();
        assert!(approx_eq!(
            f64,
            channel.current_value(),
            -2.0 * expected,
            epsilon = 1e-12
        ));
        assert!(matches!(
            channel.change_item_value(item.uid, 1.0, &curves),
            Err(AutomatonError::ItemKind { .. })
        ));

        channel.remove_item(item.uid, &mut curves).unwrap();
        assert_eq!(curves.get(ramp).unwrap().user_count(), 0);
        assert!(matches!(
            channel.create_item_curve(CurveUid(9), 0.0, &mut curves),
            Err(AutomatonError::CurveNotFound(_))
        ));
        assert_eq!(channel.item_count(), 0);
    }

    #[test]
    fn gui_probe_has_no_side_effects() {
        let (mut channel, mut curves, ramp) = setup();
        channel.create_item_curve(ramp, 0.0, &mut curves).unwrap();
        let previews = Rc::new(RefCell::new(0));
        let p = Rc::clone(&previews);
        curves
            .get_mut(ramp)
            .unwrap()
            .subscribe_kind(crate::curve::CurveEventKind::PreviewValue, move |_| {
                *p.borrow_mut() += 1
            });
        let log = record(&mut channel);

        let probed = channel.value_from_gui(1.5, &curves);
        assert_eq!(*previews.borrow(), 0);
        assert!(log.borrow().is_empty());
        assert_eq!(channel.current_value(), 0.0);

        channel.update(1.5, &mut curves);
        assert_eq!(*previews.borrow(), 1);
        assert_eq!(channel.current_value(), probed);
    }

    #[test]
    fn backward_seek_and_cue_reset() {
        let (mut channel, mut curves, _) = setup();
        for (time, value) in [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)] {
            let uid = channel.create_item_constant(time, &curves).unwrap().uid;
            channel.change_item_value(uid, value, &curves).unwrap();
        }
        channel.update(2.5, &mut curves);
        assert_eq!(channel.current_value(), 3.0);
        channel.update(0.5, &mut curves);
        assert_eq!(channel.current_value(), 1.0);

        let log = record(&mut channel);
        channel.cue_reset();
        assert!(log.borrow().is_empty(), "nothing happens until the next update");
        channel.update(1.5, &mut curves);
        assert_eq!(
            *log.borrow(),
            vec![ChannelEventKind::Reset, ChannelEventKind::ChangeValue]
        );
        assert_eq!(channel.current_value(), 2.0);
    }

    #[test]
    fn move_and_resize_stay_in_their_gap() {
        let (mut channel, mut curves, ramp) = setup();
        let a = channel.create_item_curve(ramp, 0.0, &mut curves).unwrap().uid;
        let b = channel.create_item_curve(ramp, 5.0, &mut curves).unwrap().uid;

        channel.move_item(a, 4.0, &curves).unwrap();
        assert_eq!(channel.item(a).unwrap().time, 3.0, "stops short of b");
        channel.move_item(b, 0.0, &curves).unwrap();
        assert_eq!(channel.item(b).unwrap().time, 5.0, "stops at the end of a");
        channel.move_item(b, 100.0, &curves).unwrap();
        assert_eq!(channel.item(b).unwrap().time, 100.0);

        channel.move_item(a, 0.0, &curves).unwrap();
        channel.move_item(b, 3.0, &curves).unwrap();
        channel.resize_item(a, 10.0, false, &curves).unwrap();
        assert_eq!(channel.item(a).unwrap().length, 3.0);
        channel.resize_item(a, -1.0, false, &curves).unwrap();
        assert_eq!(channel.item(a).unwrap().length, 0.0);

        channel.force_move_item(a, 4.0, &curves).unwrap();
        assert_eq!(channel.item_by_index(1).unwrap().uid, a, "re-sorted");
    }

    #[test]
    fn stretching_keeps_the_content() {
        let (mut channel, mut curves, ramp) = setup();
        let a = channel.create_item_curve(ramp, 0.0, &mut curves).unwrap().uid;
        let before = channel.value_from_gui(1.0, &curves);
        channel.resize_item(a, 4.0, true, &curves).unwrap();
        let ItemSource::Curve { speed, .. } = channel.item(a).unwrap().source else {
            panic!("a is a curve item");
        };
        assert_eq!(speed, 0.5);
        assert!(approx_eq!(
            f64,
            channel.value_from_gui(2.0, &curves),
            before,
            epsilon = 1e-12
        ));

        channel.resize_item(a, 0.0, true, &curves).unwrap();
        channel.resize_item(a, 2.0, true, &curves).unwrap();
        let ItemSource::Curve { speed, .. } = channel.item(a).unwrap().source else {
            panic!("a is a curve item");
        };
        assert!(speed.is_finite(), "a zero length doesn't poison the speed");
    }

    #[test]
    fn resize_by_left_keeps_the_end() {
        let (mut channel, mut curves, ramp) = setup();
        let a = channel.create_item_curve(ramp, 1.0, &mut curves).unwrap().uid;
        let end_value = channel.value_from_gui(3.0, &curves);

        channel.resize_item_by_left(a, 1.0, false, &curves).unwrap();
        let item = channel.item(a).unwrap();
        assert_eq!(item.time, 2.0);
        assert_eq!(item.end(), 3.0);
        assert_eq!(
            item.source,
            ItemSource::Curve {
                curve: ramp,
                speed: 1.0,
                offset: 1.0,
                amp: 1.0
            }
        );
        assert!(approx_eq!(
            f64,
            channel.value_from_gui(3.0, &curves),
            end_value,
            epsilon = 1e-12
        ));

        channel.resize_item_by_left(a, 10.0, false, &curves).unwrap();
        assert_eq!(channel.item(a).unwrap().time, 0.0, "stops at 0");

        let c = channel.create_item_constant(5.0, &curves).unwrap().uid;
        assert!(matches!(
            channel.resize_item_by_left(c, 1.0, false, &curves),
            Err(AutomatonError::UnboundedItem(_))
        ));
    }

    #[test]
    fn repeat_fills_the_first_gap() {
        let (mut channel, mut curves, ramp) = setup();
        let a = channel.create_item_curve(ramp, 0.0, &mut curves).unwrap().uid;
        channel.create_item_curve(ramp, 2.0, &mut curves).unwrap();
        channel.create_item_curve(ramp, 6.0, &mut curves).unwrap();

        let copy = channel.repeat_item(a, &mut curves).unwrap();
        assert_eq!(copy.time, 4.0);
        assert_eq!(copy.length, 2.0);
        let again = channel.repeat_item(a, &mut curves).unwrap();
        assert_eq!(again.time, 8.0, "no gaps left, so it goes at the end");
        assert_eq!(curves.get(ramp).unwrap().user_count(), 5);
        assert_no_overlap(&channel);

        let c = channel.create_item_constant(20.0, &curves).unwrap().uid;
        assert!(matches!(
            channel.repeat_item(c, &mut curves),
            Err(AutomatonError::UnboundedItem(_))
        ));
    }

    #[test]
    fn restoring_from_data() {
        let (mut channel, mut curves, ramp) = setup();
        let item = channel.create_item_curve(ramp, 0.0, &mut curves).unwrap();
        channel.remove_item(item.uid, &mut curves).unwrap();

        let back = channel
            .create_item_from_data(item.clone(), &mut curves)
            .unwrap();
        assert_eq!(back, item, "the uid survives");
        assert!(matches!(
            channel.create_item_from_data(item, &mut curves),
            Err(AutomatonError::DuplicateItem(_))
        ));
        assert_eq!(curves.get(ramp).unwrap().user_count(), 1);
    }

    #[test]
    fn change_length_trims_items() {
        let (mut channel, mut curves, ramp) = setup();
        let a = channel.create_item_curve(ramp, 0.0, &mut curves).unwrap().uid;
        let b = channel.create_item_curve(ramp, 3.0, &mut curves).unwrap().uid;
        let log = record(&mut channel);

        channel.change_length(1.0, &mut curves).unwrap();
        assert_eq!(channel.item(a).unwrap().length, 1.0);
        assert!(channel.try_item(b).is_none());
        assert_eq!(curves.get(ramp).unwrap().user_count(), 1);
        assert_eq!(log.borrow().last(), Some(&ChannelEventKind::ChangeLength));

        let c = channel.create_item_constant(0.5, &curves).unwrap().uid;
        channel.change_length(0.75, &mut curves).unwrap();
        assert!(!channel.item(c).unwrap().is_bounded());
    }

    #[test]
    fn items_never_overlap_under_random_edits() {
        let (mut channel, mut curves, ramp) = setup();
        let mut rng = Rng::new_with_seed(1234);
        for _ in 0..500 {
            let time = rng.rand_float() * 20.0;
            let uids: Vec<ItemUid> = channel.items().iter().map(|i| i.uid).collect();
            let target = (!uids.is_empty())
                .then(|| uids[rng.rand_u64() as usize % uids.len()]);
            match (rng.rand_u64() % 7, target) {
                (0, _) | (_, None) => {
                    channel.create_item_constant(time, &curves).unwrap();
                }
                (1, _) => {
                    channel.create_item_curve(ramp, time, &mut curves).unwrap();
                }
                (2, Some(uid)) => channel.move_item(uid, time, &curves).unwrap(),
                (3, Some(uid)) => channel
                    .resize_item(uid, rng.rand_float() * 5.0, rng.rand_u64() % 2 == 0, &curves)
                    .unwrap(),
                (4, Some(uid)) => {
                    let _ = channel.resize_item_by_left(uid, rng.rand_float() * 5.0, false, &curves);
                }
                (5, Some(uid)) => {
                    let _ = channel.repeat_item(uid, &mut curves);
                }
                (_, Some(uid)) => channel.remove_item(uid, &mut curves).unwrap(),
            }
            assert_no_overlap(&channel);
            assert!(channel.items().iter().all(|i| i.time >= 0.0));
        }
        let users = channel
            .items()
            .iter()
            .filter(|i| i.curve().is_some())
            .count();
        assert_eq!(curves.get(ramp).unwrap().user_count(), users);
    }

    #[test]
    fn not_used_status() {
        let (mut channel, _, _) = setup();
        assert_eq!(
            channel.status().unwrap().code,
            ChannelStatusCode::NotUsed
        );
        let log = record(&mut channel);
        channel.mark_as_used();
        channel.mark_as_used();
        assert!(channel.status().is_none());
        assert_eq!(*log.borrow(), vec![ChannelEventKind::UpdateStatus]);
    }

    #[test]
    fn load_round_trip() {
        let (mut channel, mut curves, ramp) = setup();
        let a = channel.create_item_constant(0.0, &curves).unwrap().uid;
        channel.change_item_value(a, 0.25, &curves).unwrap();
        let b = channel.create_item_curve(ramp, 1.0, &mut curves).unwrap().uid;
        channel
            .change_curve_speed_and_offset(b, -1.0, 0.5, &curves)
            .unwrap();
        channel.change_item_reset(b, true, &curves).unwrap();

        let data = channel.serialize();
        let json = serde_json::to_string(&data).unwrap();
        let back: SerializedChannel = serde_json::from_str(&json).unwrap();
        let loaded =
            Channel::new_with_data(channel.context.clone(), &back, &mut curves).unwrap();
        assert_eq!(loaded.serialize(), data);
        assert_eq!(curves.get(ramp).unwrap().user_count(), 2);
        assert_ne!(loaded.item_by_index(1).unwrap().uid, b);

        let mut dangling = data.clone();
        dangling.items[1].curve = Some(CurveUid(42));
        assert!(matches!(
            Channel::new_with_data(channel.context.clone(), &dangling, &mut curves),
            Err(AutomatonError::CurveNotFound(_))
        ));
        assert_eq!(
            curves.get(ramp).unwrap().user_count(),
            2,
            "a failed load claims nothing"
        );
    }

    #[test]
    fn mutations_mark_the_save_flag() {
        let (mut channel, curves, _) = setup();
        channel.context.save_tracker.set_should_save(false);
        channel.create_item_constant(0.0, &curves).unwrap();
        assert!(channel.context.save_tracker.should_save());
    }
}

// Copyright (c) 2024 Mike Tsao

use super::{
    bezier, BezierHandle, BezierNode, FxSection, HandleDir, SerializedCurve, FX_ROW_MAX,
};
use crate::{
    automaton::AutomatonContext,
    error::{ensure_finite, AutomatonError, Result},
    fx::{FxContext, FxParamValue, FxParams, FxRegistry},
    status::{CurveStatusCode, Status, StatusLevel, StatusList},
    traits::{HasStatus, Serializable},
    types::{FxUid, NodeUid},
    util::{Emitter, SubscriptionId},
};
use std::rc::Rc;
use strum_macros::EnumDiscriminants;

/// Everything a [Curve] tells its subscribers about.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(CurveEventKind), derive(Hash), allow(missing_docs))]
pub enum CurveEvent {
    /// A node was added.
    CreateNode {
        #[allow(missing_docs)]
        uid: NodeUid,
        /// The node as it now stands.
        node: BezierNode,
    },
    /// A node moved or one of its handles changed.
    UpdateNode {
        #[allow(missing_docs)]
        uid: NodeUid,
        /// The node as it now stands.
        node: BezierNode,
    },
    /// A node was removed.
    RemoveNode {
        #[allow(missing_docs)]
        uid: NodeUid,
    },
    /// An fx section was added.
    CreateFx {
        #[allow(missing_docs)]
        uid: FxUid,
        /// The section as it now stands.
        fx: FxSection,
    },
    /// An fx section moved, resized, or changed a parameter.
    UpdateFx {
        #[allow(missing_docs)]
        uid: FxUid,
        /// The section as it now stands.
        fx: FxSection,
    },
    /// An fx section was removed.
    RemoveFx {
        #[allow(missing_docs)]
        uid: FxUid,
    },
    /// A channel item just sampled the curve during live playback.
    PreviewValue {
        /// The curve-local time that was sampled.
        time: f64,
        /// The value the item produced.
        value: f64,
    },
    /// The sample table was rebuilt.
    Precalc,
    /// The most severe diagnostic changed.
    UpdateStatus,
    /// The curve's length changed.
    ChangeLength {
        #[allow(missing_docs)]
        length: f64,
    },
}

/// A chain of bezier nodes with fx sections layered on top, precalculated
/// into a table of evenly spaced samples.
///
/// The first node always sits at time 0 and the last node at the curve's
/// length; neither can be removed. Every edit re-sorts, rebuilds the table
/// and refreshes the diagnostics before it notifies anyone.
#[derive(Debug)]
pub struct Curve {
    nodes: Vec<BezierNode>,
    fxs: Vec<FxSection>,
    length: f64,
    resolution: f64,
    values: Vec<f64>,
    user_count: usize,
    is_marked_used: bool,
    status: StatusList<CurveStatusCode>,
    context: AutomatonContext,
    emitter: Emitter<CurveEvent>,
}
impl Curve {
    /// A flat curve from (0, 0) to (`length`, 0).
    pub fn new_with(context: AutomatonContext, length: f64, resolution: f64) -> Result<Self> {
        Self::check_length(length)?;
        Self::check_resolution(resolution)?;
        let mut first = BezierNode::new_with(context.uid_factory.mint_next(), 0.0, 0.0);
        first.in_handle = None;
        let mut last = BezierNode::new_with(context.uid_factory.mint_next(), length, 0.0);
        last.out_handle = None;
        Ok(Self::new_from_parts(
            context,
            vec![first, last],
            Vec::default(),
            resolution,
        ))
    }

    /// Loads a curve from saved data. Nodes and fx sections get fresh uids.
    pub fn new_with_data(
        context: AutomatonContext,
        data: &SerializedCurve,
        resolution: f64,
    ) -> Result<Self> {
        Self::check_resolution(resolution)?;
        if data.nodes.len() < 2 {
            return Err(AutomatonError::InvalidCurve("a curve needs at least two nodes"));
        }
        let mut nodes = data.nodes.clone();
        for node in nodes.iter_mut() {
            node.time = ensure_finite("node time", node.time)?.max(0.0);
            ensure_finite("node value", node.value)?;
            node.uid = context.uid_factory.mint_next();
        }
        nodes.sort_by(|a, b| a.time.total_cmp(&b.time));
        nodes[0].time = 0.0;
        let length = nodes[nodes.len() - 1].time;
        Self::check_length(length)?;

        let mut fxs: Vec<FxSection> = Vec::with_capacity(data.fxs.len());
        for fx in data.fxs.iter() {
            Self::check_fx_range(fx.time, fx.length)?;
            let params = Self::checked_fx_params(&context.fx_registry, fx)?;
            let (time, fx_length) = Self::fit_fx_range(length, fx.time, fx.length);
            let row = Self::free_row_in(&fxs, time, fx_length, fx.row);
            if row >= FX_ROW_MAX {
                log::warn!("Dropping fx {} at {}: too many fx stacks here", fx.kind, fx.time);
                continue;
            }
            fxs.push(FxSection {
                uid: context.uid_factory.mint_next(),
                time,
                length: fx_length,
                row,
                params,
                ..fx.clone()
            });
            Self::sort_fxs_in(&mut fxs);
        }

        Ok(Self::new_from_parts(context, nodes, fxs, resolution))
    }

    fn new_from_parts(
        context: AutomatonContext,
        nodes: Vec<BezierNode>,
        fxs: Vec<FxSection>,
        resolution: f64,
    ) -> Self {
        let mut r = Self {
            length: nodes.last().map(|n| n.time).unwrap_or_default(),
            nodes,
            fxs,
            resolution,
            values: Vec::default(),
            user_count: 0,
            is_marked_used: false,
            status: Default::default(),
            context,
            emitter: Default::default(),
        };
        r.status.set(Self::not_used_status());
        r.precalc();
        r
    }

    fn check_length(length: f64) -> Result<()> {
        if length.is_finite() && length > 0.0 {
            Ok(())
        } else {
            Err(AutomatonError::InvalidLength(length))
        }
    }

    fn check_resolution(resolution: f64) -> Result<()> {
        if resolution.is_finite() && resolution > 0.0 {
            Ok(())
        } else {
            Err(AutomatonError::InvalidResolution(resolution))
        }
    }

    fn not_used_status() -> Status<CurveStatusCode> {
        Status::new_with(
            CurveStatusCode::NotUsed,
            StatusLevel::Warning,
            "This curve has not been used yet",
        )
    }

    fn nan_status() -> Status<CurveStatusCode> {
        Status::new_with(
            CurveStatusCode::NanDetected,
            StatusLevel::Error,
            "This curve has NaN value",
        )
    }

    /// The time of the last node.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Samples per unit of time.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// The precalculated table. Sample `i` is at time `i / resolution`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// All nodes, sorted by time.
    pub fn nodes(&self) -> &[BezierNode] {
        &self.nodes
    }

    /// All fx sections, sorted by row and then by time.
    pub fn fxs(&self) -> &[FxSection] {
        &self.fxs
    }

    /// How many channel items refer to this curve.
    pub fn user_count(&self) -> usize {
        self.user_count
    }

    /// Registers a handler for every event.
    pub fn subscribe(&mut self, handler: impl FnMut(&CurveEvent) + 'static) -> SubscriptionId {
        self.emitter.subscribe(handler)
    }

    /// Registers a handler for one kind of event.
    pub fn subscribe_kind(
        &mut self,
        kind: CurveEventKind,
        handler: impl FnMut(&CurveEvent) + 'static,
    ) -> SubscriptionId {
        self.emitter.subscribe_kind(kind, handler)
    }

    /// Removes a handler.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn emit(&mut self, event_fn: impl FnOnce(&Self) -> CurveEvent) {
        if self.emitter.subscriber_count() > 0 {
            let event = event_fn(self);
            self.emitter.emit(&event);
        }
    }

    /// Rebuilds the table, then reports the change.
    fn commit(&mut self, event_fn: impl FnOnce(&Self) -> CurveEvent) {
        self.precalc();
        self.emit(event_fn);
        self.context.save_tracker.mark();
    }

    fn node_event(&self, uid: NodeUid, is_create: bool) -> CurveEvent {
        let node = self.try_node(uid).cloned().unwrap_or_default();
        if is_create {
            CurveEvent::CreateNode { uid, node }
        } else {
            CurveEvent::UpdateNode { uid, node }
        }
    }

    fn fx_event(&self, uid: FxUid, is_create: bool) -> CurveEvent {
        let fx = self.try_fx(uid).cloned().unwrap_or_default();
        if is_create {
            CurveEvent::CreateFx { uid, fx }
        } else {
            CurveEvent::UpdateFx { uid, fx }
        }
    }

    /// Rebuilds the sample table from the nodes and fx sections. Non-finite
    /// samples become 0 and raise [CurveStatusCode::NanDetected].
    pub fn precalc(&mut self) {
        let count = (self.resolution * self.length).ceil() as usize + 1;
        self.values.clear();
        self.values.resize(count, 0.0);
        bezier::sample_nodes(&self.nodes, self.resolution, &mut self.values);
        self.apply_fxs();

        let mut has_nan = false;
        for v in self.values.iter_mut().filter(|v| !v.is_finite()) {
            *v = 0.0;
            has_nan = true;
        }
        let status_changed = self
            .status
            .watch(|s| s.set_active(has_nan, Self::nan_status()));
        if status_changed {
            self.emitter.emit(&CurveEvent::UpdateStatus);
        }
        self.emitter.emit(&CurveEvent::Precalc);
    }

    fn apply_fxs(&mut self) {
        let registry = Rc::clone(&self.context.fx_registry);
        let last = self.values.len() - 1;
        for fx in self.fxs.iter().filter(|fx| !fx.bypassed) {
            let Some(definition) = registry.get(&fx.kind) else {
                log::warn!("Fx definition {} is not registered; skipping it", fx.kind);
                continue;
            };
            let i0 = (fx.time * self.resolution).ceil().max(0.0) as usize;
            let i1 = (fx.end().min(self.length) * self.resolution).floor();
            if i1 < 0.0 {
                continue;
            }
            let i1 = (i1 as usize).min(last);
            if i0 > i1 {
                continue;
            }
            let source = self.values.clone();
            let context = FxContext {
                i0,
                i1,
                t0: fx.time,
                t1: fx.end(),
                length: fx.length,
                resolution: self.resolution,
                delta_time: 1.0 / self.resolution,
                params: &fx.params,
                source: &source,
            };
            definition.process(&context, &mut self.values[i0..=i1]);
        }
    }

    /// Reads the table at `time`, interpolating between samples. Times
    /// before 0 read the first sample, and times at or after the end read
    /// the last.
    pub fn value_at(&self, time: f64) -> f64 {
        let Some(&last) = self.values.last() else {
            return 0.0;
        };
        if time.is_nan() || time <= 0.0 {
            return self.values[0];
        }
        if time >= self.length {
            return last;
        }
        let index = time * self.resolution;
        let i = index.floor() as usize;
        if i + 1 >= self.values.len() {
            return last;
        }
        let frac = index - i as f64;
        self.values[i] + (self.values[i + 1] - self.values[i]) * frac
    }

    /// Changes the sample rate and rebuilds the table.
    pub(crate) fn set_resolution(&mut self, resolution: f64) -> Result<()> {
        Self::check_resolution(resolution)?;
        self.resolution = resolution;
        self.precalc();
        Ok(())
    }

    /// Tells subscribers what a channel item just read from this curve. Only
    /// the live playback path calls this.
    pub(crate) fn set_preview_time_value(&mut self, time: f64, value: f64) {
        self.emitter
            .emit_with(|| CurveEvent::PreviewValue { time, value });
    }

    pub(crate) fn increment_user_count(&mut self) {
        self.user_count += 1;
        self.refresh_usage_status();
    }

    pub(crate) fn decrement_user_count(&mut self) {
        self.user_count = self.user_count.saturating_sub(1);
        self.refresh_usage_status();
    }

    fn refresh_usage_status(&mut self) {
        let not_used = !self.is_marked_used && self.user_count == 0;
        if self
            .status
            .watch(|s| s.set_active(not_used, Self::not_used_status()))
        {
            self.emitter.emit(&CurveEvent::UpdateStatus);
        }
    }

    // Nodes

    /// The number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The `index`-th node in time order.
    pub fn node_by_index(&self, index: usize) -> Result<&BezierNode> {
        self.nodes
            .get(index)
            .ok_or(AutomatonError::IndexOutOfRange {
                what: "node",
                index,
                count: self.nodes.len(),
            })
    }

    /// The node with this uid.
    pub fn node(&self, uid: NodeUid) -> Result<&BezierNode> {
        self.try_node(uid).ok_or(AutomatonError::NodeNotFound(uid))
    }

    /// The node with this uid, if there is one.
    pub fn try_node(&self, uid: NodeUid) -> Option<&BezierNode> {
        self.nodes.iter().find(|n| n.uid == uid)
    }

    fn node_index(&self, uid: NodeUid) -> Result<usize> {
        self.nodes
            .iter()
            .position(|n| n.uid == uid)
            .ok_or(AutomatonError::NodeNotFound(uid))
    }

    /// Whether the node is one of the two pinned end nodes.
    pub fn is_first_or_last_node(&self, uid: NodeUid) -> Result<bool> {
        let index = self.node_index(uid)?;
        Ok(index == 0 || index == self.nodes.len() - 1)
    }

    /// Where a node at `time` goes: after every node at or before `time`,
    /// but never outside the pinned ends.
    fn interior_insert_index(&self, time: f64) -> usize {
        self.nodes
            .partition_point(|n| n.time <= time)
            .clamp(1, self.nodes.len() - 1)
    }

    /// Adds a node with default handles. The time is kept within the curve.
    pub fn create_node(&mut self, time: f64, value: f64) -> Result<BezierNode> {
        let time = ensure_finite("node time", time)?.clamp(0.0, self.length);
        ensure_finite("node value", value)?;
        let node = BezierNode::new_with(self.context.uid_factory.mint_next(), time, value);
        let uid = node.uid;
        let index = self.interior_insert_index(time);
        self.nodes.insert(index, node.clone());
        self.commit(|c| c.node_event(uid, true));
        Ok(node)
    }

    /// Puts back a node that was removed earlier, keeping its uid.
    pub fn create_node_from_data(&mut self, node: BezierNode) -> Result<BezierNode> {
        ensure_finite("node time", node.time)?;
        ensure_finite("node value", node.value)?;
        let mut node = node;
        node.time = node.time.clamp(0.0, self.length);
        if node.uid == NodeUid::default() || self.try_node(node.uid).is_some() {
            node.uid = self.context.uid_factory.mint_next();
        } else {
            self.context
                .uid_factory
                .notify_externally_minted_uid(&node.uid);
        }
        let uid = node.uid;
        let index = self.interior_insert_index(node.time);
        self.nodes.insert(index, node.clone());
        self.commit(|c| c.node_event(uid, true));
        Ok(node)
    }

    /// Removes a node. The end nodes can't be removed; asking to do so does
    /// nothing.
    pub fn remove_node(&mut self, uid: NodeUid) -> Result<()> {
        let index = self.node_index(uid)?;
        if index == 0 || index == self.nodes.len() - 1 {
            log::debug!("Ignoring request to remove end node {uid}");
            return Ok(());
        }
        self.nodes.remove(index);
        self.commit(|_| CurveEvent::RemoveNode { uid });
        Ok(())
    }

    /// Moves a node in time, keeping it between its neighbors. The end nodes
    /// stay pinned to 0 and to the length.
    pub fn move_node_time(&mut self, uid: NodeUid, time: f64) -> Result<()> {
        ensure_finite("node time", time)?;
        let index = self.node_index(uid)?;
        let last = self.nodes.len() - 1;
        self.nodes[index].time = if index == 0 {
            0.0
        } else if index == last {
            self.length
        } else {
            time.max(self.nodes[index - 1].time)
                .min(self.nodes[index + 1].time)
        };
        self.commit(|c| c.node_event(uid, false));
        Ok(())
    }

    /// Moves a node in value.
    pub fn move_node_value(&mut self, uid: NodeUid, value: f64) -> Result<()> {
        ensure_finite("node value", value)?;
        let index = self.node_index(uid)?;
        self.nodes[index].value = value;
        self.commit(|c| c.node_event(uid, false));
        Ok(())
    }

    /// The first node has no in handle and the last has no out handle.
    fn is_handle_locked(&self, index: usize, dir: HandleDir) -> bool {
        (index == 0 && dir == HandleDir::In)
            || (index == self.nodes.len() - 1 && dir == HandleDir::Out)
    }

    /// Sets the time of a handle, forcing it onto its own side of the node.
    /// A handle that ends up exactly zero is removed.
    pub fn move_handle_time(&mut self, uid: NodeUid, dir: HandleDir, time: f64) -> Result<()> {
        ensure_finite("handle time", time)?;
        let index = self.node_index(uid)?;
        if self.is_handle_locked(index, dir) {
            return Ok(());
        }
        let time = dir.clamp_time(time);
        let slot = self.nodes[index].handle_mut(dir);
        *slot = match *slot {
            Some(handle) if time == 0.0 && handle.value == 0.0 => None,
            Some(handle) => Some(BezierHandle { time, ..handle }),
            None if time != 0.0 => Some(BezierHandle { time, value: 0.0 }),
            None => None,
        };
        self.commit(|c| c.node_event(uid, false));
        Ok(())
    }

    /// Sets the value of a handle. A handle that ends up exactly zero is
    /// removed.
    pub fn move_handle_value(&mut self, uid: NodeUid, dir: HandleDir, value: f64) -> Result<()> {
        ensure_finite("handle value", value)?;
        let index = self.node_index(uid)?;
        if self.is_handle_locked(index, dir) {
            return Ok(());
        }
        let slot = self.nodes[index].handle_mut(dir);
        *slot = match *slot {
            Some(handle) if value == 0.0 && handle.time == 0.0 => None,
            Some(handle) => Some(BezierHandle { value, ..handle }),
            None if value != 0.0 => Some(BezierHandle { time: 0.0, value }),
            None => None,
        };
        self.commit(|c| c.node_event(uid, false));
        Ok(())
    }

    /// Puts a handle back to its default length and a value of 0.
    pub fn reset_handle(&mut self, uid: NodeUid, dir: HandleDir) -> Result<()> {
        let index = self.node_index(uid)?;
        if self.is_handle_locked(index, dir) {
            return Ok(());
        }
        *self.nodes[index].handle_mut(dir) = Some(BezierHandle::default_for(dir));
        self.commit(|c| c.node_event(uid, false));
        Ok(())
    }

    // Fx sections

    /// The number of fx sections.
    pub fn fx_count(&self) -> usize {
        self.fxs.len()
    }

    /// The `index`-th fx section in (row, time) order.
    pub fn fx_by_index(&self, index: usize) -> Result<&FxSection> {
        self.fxs.get(index).ok_or(AutomatonError::IndexOutOfRange {
            what: "fx section",
            index,
            count: self.fxs.len(),
        })
    }

    /// The fx section with this uid.
    pub fn fx(&self, uid: FxUid) -> Result<&FxSection> {
        self.try_fx(uid).ok_or(AutomatonError::FxNotFound(uid))
    }

    /// The fx section with this uid, if there is one.
    pub fn try_fx(&self, uid: FxUid) -> Option<&FxSection> {
        self.fxs.iter().find(|fx| fx.uid == uid)
    }

    fn fx_index(&self, uid: FxUid) -> Result<usize> {
        self.fxs
            .iter()
            .position(|fx| fx.uid == uid)
            .ok_or(AutomatonError::FxNotFound(uid))
    }

    fn sort_fxs_in(fxs: &mut [FxSection]) {
        fxs.sort_by(|a, b| a.row.cmp(&b.row).then(a.time.total_cmp(&b.time)));
    }

    /// The lowest row at or above `min_row` where `[time, time + length)`
    /// overlaps nothing. `FX_ROW_MAX` or more means there's no room.
    fn free_row_in(fxs: &[FxSection], time: f64, length: f64, min_row: usize) -> usize {
        let mut row = min_row;
        while row < FX_ROW_MAX
            && fxs
                .iter()
                .any(|fx| fx.row == row && fx.overlaps(time, length))
        {
            row += 1;
        }
        row
    }

    /// The sections immediately before and after `index` on its row.
    fn row_neighbors(&self, index: usize) -> (Option<&FxSection>, Option<&FxSection>) {
        let row = self.fxs[index].row;
        let prev = index
            .checked_sub(1)
            .and_then(|i| self.fxs.get(i))
            .filter(|fx| fx.row == row);
        let next = self.fxs.get(index + 1).filter(|fx| fx.row == row);
        (prev, next)
    }

    fn check_fx_range(time: f64, length: f64) -> Result<()> {
        ensure_finite("fx time", time)?;
        ensure_finite("fx length", length)?;
        if length < 0.0 {
            return Err(AutomatonError::InvalidLength(length));
        }
        Ok(())
    }

    /// Pulls `[time, time + length]` inside `[0, curve_length]`.
    fn fit_fx_range(curve_length: f64, time: f64, length: f64) -> (f64, f64) {
        let time = time.clamp(0.0, curve_length);
        (time, length.min(curve_length - time))
    }

    /// Params of a section coming from data, checked against its definition.
    /// Missing ones get their defaults and unknown ones are dropped.
    fn checked_fx_params(registry: &FxRegistry, fx: &FxSection) -> Result<FxParams> {
        let mut params = registry.generate_default_params(&fx.kind)?;
        for (name, value) in fx.params.iter() {
            match registry.validate_param(&fx.kind, name, *value) {
                Ok(value) => {
                    params.insert(name.clone(), value);
                }
                Err(AutomatonError::UnknownFxParam { .. }) => {
                    log::warn!("Ignoring unknown param {name} of fx {}", fx.kind);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(params)
    }

    /// Adds a section of the given kind in the lowest row with room for it.
    /// Returns `Ok(None)` if every row is taken at that time.
    pub fn create_fx(&mut self, time: f64, length: f64, kind: &str) -> Result<Option<FxSection>> {
        Self::check_fx_range(time, length)?;
        let params = self.context.fx_registry.generate_default_params(kind)?;
        let (time, length) = Self::fit_fx_range(self.length, time, length);
        let row = Self::free_row_in(&self.fxs, time, length, 0);
        if row >= FX_ROW_MAX {
            log::warn!("Too many fx stacks at {time}");
            return Ok(None);
        }
        let fx = FxSection {
            uid: self.context.uid_factory.mint_next(),
            time,
            length,
            row,
            kind: kind.to_string(),
            bypassed: false,
            params,
        };
        Ok(Some(self.insert_fx(fx)))
    }

    /// Puts back a section that was removed earlier, keeping its uid. It
    /// goes in its own row if there's room, or the next free row above.
    pub fn create_fx_from_data(&mut self, fx: FxSection) -> Result<Option<FxSection>> {
        Self::check_fx_range(fx.time, fx.length)?;
        let params = Self::checked_fx_params(&self.context.fx_registry, &fx)?;
        let (time, length) = Self::fit_fx_range(self.length, fx.time, fx.length);
        let row = Self::free_row_in(&self.fxs, time, length, fx.row);
        if row >= FX_ROW_MAX {
            log::warn!("Too many fx stacks at {time}");
            return Ok(None);
        }
        let mut fx = FxSection {
            time,
            length,
            row,
            params,
            ..fx
        };
        if fx.uid == FxUid::default() || self.try_fx(fx.uid).is_some() {
            fx.uid = self.context.uid_factory.mint_next();
        } else {
            self.context.uid_factory.notify_externally_minted_uid(&fx.uid);
        }
        Ok(Some(self.insert_fx(fx)))
    }

    fn insert_fx(&mut self, fx: FxSection) -> FxSection {
        let uid = fx.uid;
        self.fxs.push(fx.clone());
        Self::sort_fxs_in(&mut self.fxs);
        self.commit(|c| c.fx_event(uid, true));
        fx
    }

    /// Removes a section.
    pub fn remove_fx(&mut self, uid: FxUid) -> Result<()> {
        let index = self.fx_index(uid)?;
        self.fxs.remove(index);
        self.commit(|_| CurveEvent::RemoveFx { uid });
        Ok(())
    }

    /// Moves a section in time without leaving the gap between its row
    /// neighbors (or the curve's ends).
    pub fn move_fx(&mut self, uid: FxUid, time: f64) -> Result<()> {
        ensure_finite("fx time", time)?;
        let index = self.fx_index(uid)?;
        let (prev, next) = self.row_neighbors(index);
        let left = prev.map_or(0.0, FxSection::end);
        let right = next.map_or(self.length, |fx| fx.time);
        let fx = &mut self.fxs[index];
        fx.time = time.min(right - fx.length).max(left);
        Self::sort_fxs_in(&mut self.fxs);
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Moves a section to another row. Rows outside `0..FX_ROW_MAX` are an
    /// error; a row where the section would overlap another is ignored.
    pub fn change_fx_row(&mut self, uid: FxUid, row: usize) -> Result<()> {
        let index = self.fx_index(uid)?;
        if row >= FX_ROW_MAX {
            return Err(AutomatonError::InvalidRow(row));
        }
        let fx = &self.fxs[index];
        if fx.row == row {
            return Ok(());
        }
        let (time, length) = (fx.time, fx.length);
        if self
            .fxs
            .iter()
            .any(|other| other.row == row && other.overlaps(time, length))
        {
            log::debug!("Fx {uid} would overlap another section on row {row}; not moving it");
            return Ok(());
        }
        self.fxs[index].row = row;
        Self::sort_fxs_in(&mut self.fxs);
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Bypasses or re-enables a section.
    pub fn bypass_fx(&mut self, uid: FxUid, bypassed: bool) -> Result<()> {
        let index = self.fx_index(uid)?;
        self.fxs[index].bypassed = bypassed;
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Sets a parameter of a section. The value must have the type its
    /// definition declares and is clamped to the declared bounds.
    pub fn change_fx_param(
        &mut self,
        uid: FxUid,
        name: &str,
        value: impl Into<FxParamValue>,
    ) -> Result<()> {
        let index = self.fx_index(uid)?;
        let value = self
            .context
            .fx_registry
            .validate_param(&self.fxs[index].kind, name, value.into())?;
        self.fxs[index].params.insert(name.to_string(), value);
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Puts a section at an exact time and row without checking for room.
    /// Meant for replaying history, where neighbors are being restored too.
    pub fn force_move_fx(&mut self, uid: FxUid, time: f64, row: usize) -> Result<()> {
        ensure_finite("fx time", time)?;
        let index = self.fx_index(uid)?;
        if row >= FX_ROW_MAX {
            return Err(AutomatonError::InvalidRow(row));
        }
        let fx = &mut self.fxs[index];
        fx.time = time;
        fx.row = row;
        Self::sort_fxs_in(&mut self.fxs);
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Changes a section's length, keeping its start and stopping short of
    /// the next section on its row.
    pub fn resize_fx(&mut self, uid: FxUid, length: f64) -> Result<()> {
        ensure_finite("fx length", length)?;
        let index = self.fx_index(uid)?;
        let (_, next) = self.row_neighbors(index);
        let right = next.map_or(self.length, |fx| fx.time);
        let fx = &mut self.fxs[index];
        fx.length = length.min(right - fx.time).max(0.0);
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Changes a section's length, keeping its end and stopping short of the
    /// previous section on its row.
    pub fn resize_fx_by_left(&mut self, uid: FxUid, length: f64) -> Result<()> {
        ensure_finite("fx length", length)?;
        let index = self.fx_index(uid)?;
        let (prev, _) = self.row_neighbors(index);
        let left = prev.map_or(0.0, FxSection::end);
        let fx = &mut self.fxs[index];
        let end = fx.end();
        fx.length = length.max(0.0).min(end - left);
        fx.time = end - fx.length;
        Self::sort_fxs_in(&mut self.fxs);
        self.commit(|c| c.fx_event(uid, false));
        Ok(())
    }

    /// Changes the curve's length.
    ///
    /// Shrinking deletes the nodes past the new end and either pins a node
    /// that lands exactly on it or adds a new end node. Fx sections that
    /// start at or past the new end are deleted and those crossing it are
    /// shortened. Nothing is reported until the whole edit is done and the
    /// table has been rebuilt. The edit can't be undone except by reloading
    /// a snapshot taken beforehand.
    pub fn change_length(&mut self, length: f64) -> Result<()> {
        Self::check_length(length)?;
        if length == self.length {
            return Ok(());
        }
        let mut events = Vec::default();

        let mut i = self.nodes.len();
        while i > 0 {
            i -= 1;
            let node_time = self.nodes[i].time;
            if i > 0 && length < node_time {
                let node = self.nodes.remove(i);
                events.push(CurveEvent::RemoveNode { uid: node.uid });
            } else if node_time == length {
                let node = &mut self.nodes[i];
                node.out_handle = None;
                events.push(CurveEvent::UpdateNode {
                    uid: node.uid,
                    node: node.clone(),
                });
                break;
            } else {
                let node = &mut self.nodes[i];
                node.out_handle = Some(BezierHandle::default_for(HandleDir::Out));
                events.push(CurveEvent::UpdateNode {
                    uid: node.uid,
                    node: node.clone(),
                });
                let mut new_node =
                    BezierNode::new_with(self.context.uid_factory.mint_next(), length, 0.0);
                new_node.out_handle = None;
                events.push(CurveEvent::CreateNode {
                    uid: new_node.uid,
                    node: new_node.clone(),
                });
                self.nodes.push(new_node);
                break;
            }
        }

        let mut i = self.fxs.len();
        while i > 0 {
            i -= 1;
            let fx = &mut self.fxs[i];
            if fx.time >= length {
                let uid = fx.uid;
                self.fxs.remove(i);
                events.push(CurveEvent::RemoveFx { uid });
            } else if fx.end() > length {
                fx.length = length - fx.time;
                events.push(CurveEvent::UpdateFx {
                    uid: fx.uid,
                    fx: fx.clone(),
                });
            }
        }

        self.length = length;
        self.precalc();
        for event in events {
            self.emitter.emit(&event);
        }
        self.emitter.emit(&CurveEvent::ChangeLength { length });
        self.context.save_tracker.mark();
        Ok(())
    }
}
impl HasStatus for Curve {
    type Code = CurveStatusCode;

    fn status_list(&self) -> &StatusList<CurveStatusCode> {
        &self.status
    }

    fn mark_as_used(&mut self) {
        self.is_marked_used = true;
        self.refresh_usage_status();
    }
}
impl Serializable for Curve {
    type Serialized = SerializedCurve;

    fn serialize(&self) -> SerializedCurve {
        SerializedCurve {
            nodes: self.nodes.clone(),
            fxs: self.fxs.clone(),
        }
    }
}

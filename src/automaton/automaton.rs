// Copyright (c) 2024 Mike Tsao

use super::{AutomatonContext, AutomatonOptions, SerializedAutomaton};
use crate::{
    channel::{Channel, ChannelItem, SerializedChannel},
    curve::{Curve, Curves, SerializedCurve},
    error::{AutomatonError, Result},
    fx::{FxParam, FxParams, FxRegistry},
    traits::{HasStatus, Serializable},
    types::CurveUid,
    util::{Emitter, SubscriptionId},
};
use delegate::delegate;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use strum_macros::EnumDiscriminants;

/// Everything an [Automaton] tells its subscribers about. Changes to the
/// "has unsaved changes" flag are published by its
/// [SaveTracker](crate::util::SaveTracker) instead.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(AutomatonEventKind), derive(Hash), allow(missing_docs))]
pub enum AutomatonEvent {
    /// Someone asked for playback to start.
    Play,
    /// Someone asked for playback to stop.
    Pause,
    /// Someone asked for playback to jump.
    Seek {
        #[allow(missing_docs)]
        time: f64,
    },
    /// New data replaced everything.
    Load,
    /// Every channel was updated.
    Update {
        #[allow(missing_docs)]
        time: f64,
    },
    #[allow(missing_docs)]
    CreateChannel { name: String },
    #[allow(missing_docs)]
    RemoveChannel { name: String },
    #[allow(missing_docs)]
    CreateCurve { uid: CurveUid },
    #[allow(missing_docs)]
    RemoveCurve { uid: CurveUid },
    /// The timeline length or resolution changed.
    ChangeLength {
        #[allow(missing_docs)]
        length: f64,
        #[allow(missing_docs)]
        resolution: f64,
    },
    /// An entry of the editor metadata changed.
    UpdateMetadata {
        #[allow(missing_docs)]
        key: String,
    },
}

/// Owns the curves and channels of one piece of animation, along with the
/// timeline length, the sample resolution and the fx registry.
///
/// The automaton has no clock of its own. Call [Automaton::update()] with the
/// current time and then read channel values, or let [Automaton::auto()] do
/// both the lookup and the bookkeeping.
#[derive(Debug)]
pub struct Automaton {
    length: f64,
    resolution: f64,
    time: f64,
    curves: Curves,
    channels: FxHashMap<String, Channel>,
    metadata: serde_json::Map<String, serde_json::Value>,
    is_playing: bool,
    disable_channel_not_used_warning: bool,
    context: AutomatonContext,
    emitter: Emitter<AutomatonEvent>,
}
impl Automaton {
    /// An empty automaton with the built-in effects.
    pub fn new(options: AutomatonOptions) -> Result<Self> {
        Self::new_with_registry(options, FxRegistry::with_builtins())
    }

    /// An empty automaton that uses the given effects.
    pub fn new_with_registry(options: AutomatonOptions, fx_registry: FxRegistry) -> Result<Self> {
        Self::check_length_and_resolution(options.length, options.resolution)?;
        Ok(Self {
            length: options.length,
            resolution: options.resolution,
            time: 0.0,
            curves: Default::default(),
            channels: Default::default(),
            metadata: Default::default(),
            is_playing: options.is_playing,
            disable_channel_not_used_warning: options.disable_channel_not_used_warning,
            context: AutomatonContext::new_with(fx_registry),
            emitter: Default::default(),
        })
    }

    /// An automaton with the built-in effects, loaded from saved data.
    pub fn new_with_data(data: &SerializedAutomaton, options: AutomatonOptions) -> Result<Self> {
        let mut r = Self::new(options)?;
        r.load(data)?;
        Ok(r)
    }

    /// Parses JSON written by [Automaton::to_json()] and loads it.
    pub fn from_json(json: &str, options: AutomatonOptions) -> Result<Self> {
        let data: SerializedAutomaton = serde_json::from_str(json)?;
        Self::new_with_data(&data, options)
    }

    fn check_length_and_resolution(length: f64, resolution: f64) -> Result<()> {
        if !length.is_finite() || length <= 0.0 {
            return Err(AutomatonError::InvalidLength(length));
        }
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(AutomatonError::InvalidResolution(resolution));
        }
        Ok(())
    }

    /// The version written into saved data.
    pub fn version(&self) -> &'static str {
        crate::app_version()
    }

    #[allow(missing_docs)]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Samples per unit of time, used by every curve.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// The time of the last [Automaton::update()].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The services shared by everything this automaton owns.
    pub fn context(&self) -> &AutomatonContext {
        &self.context
    }

    /// Registers a handler for every event.
    pub fn subscribe(&mut self, handler: impl FnMut(&AutomatonEvent) + 'static) -> SubscriptionId {
        self.emitter.subscribe(handler)
    }

    /// Registers a handler for one kind of event.
    pub fn subscribe_kind(
        &mut self,
        kind: AutomatonEventKind,
        handler: impl FnMut(&AutomatonEvent) + 'static,
    ) -> SubscriptionId {
        self.emitter.subscribe_kind(kind, handler)
    }

    /// Removes a handler.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    // Playback

    #[allow(missing_docs)]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Records that playback started and tells subscribers. The automaton
    /// doesn't keep time itself.
    pub fn play(&mut self) {
        self.is_playing = true;
        self.emitter.emit(&AutomatonEvent::Play);
    }

    /// Records that playback stopped and tells subscribers.
    pub fn pause(&mut self) {
        self.is_playing = false;
        self.emitter.emit(&AutomatonEvent::Pause);
    }

    #[allow(missing_docs)]
    pub fn toggle_play(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Asks whoever owns the clock to jump to `time`. Nothing else happens
    /// until the next [Automaton::update()].
    pub fn seek(&mut self, time: f64) {
        self.emitter.emit(&AutomatonEvent::Seek { time });
    }

    /// Brings every channel to `time`.
    pub fn update(&mut self, time: f64) {
        self.time = time;
        for channel in self.channels.values_mut() {
            channel.update(time, &mut self.curves);
        }
        self.emitter.emit(&AutomatonEvent::Update { time });
    }

    /// The current value of the named channel. The channel is created if it
    /// doesn't exist yet, and either way it counts as used from now on.
    pub fn auto(&mut self, name: &str) -> f64 {
        if !self.channels.contains_key(name) {
            let channel = Channel::new_with(self.context.clone());
            self.insert_channel(name, channel);
        }
        match self.channels.get_mut(name) {
            Some(channel) => {
                channel.mark_as_used();
                channel.current_value()
            }
            None => 0.0,
        }
    }

    // Channels

    fn insert_channel(&mut self, name: &str, mut channel: Channel) -> &mut Channel {
        if self.disable_channel_not_used_warning {
            channel.mark_as_used();
        }
        self.emitter.emit(&AutomatonEvent::CreateChannel {
            name: name.to_string(),
        });
        self.context.save_tracker.mark();
        self.channels.entry(name.to_string()).or_insert(channel)
    }

    fn build_channel(&mut self, data: Option<&SerializedChannel>) -> Result<Channel> {
        match data {
            Some(data) => Channel::new_with_data(self.context.clone(), data, &mut self.curves),
            None => Ok(Channel::new_with(self.context.clone())),
        }
    }

    /// Adds a channel, optionally loading it from saved data. Fails if the
    /// name is taken.
    pub fn create_channel(
        &mut self,
        name: &str,
        data: Option<&SerializedChannel>,
    ) -> Result<&mut Channel> {
        if self.channels.contains_key(name) {
            return Err(AutomatonError::ChannelExists(name.to_string()));
        }
        let channel = self.build_channel(data)?;
        Ok(self.insert_channel(name, channel))
    }

    /// Adds a channel, replacing any channel of the same name.
    pub fn create_or_overwrite_channel(
        &mut self,
        name: &str,
        data: Option<&SerializedChannel>,
    ) -> Result<&mut Channel> {
        let channel = self.build_channel(data)?;
        if self.channels.contains_key(name) {
            self.remove_channel(name)?;
        }
        Ok(self.insert_channel(name, channel))
    }

    /// Removes a channel. Curves its items played lose those users.
    pub fn remove_channel(&mut self, name: &str) -> Result<()> {
        let channel = self
            .channels
            .remove(name)
            .ok_or_else(|| AutomatonError::ChannelNotFound(name.to_string()))?;
        for uid in channel.items().iter().filter_map(ChannelItem::curve) {
            if let Some(curve) = self.curves.get_mut(uid) {
                curve.decrement_user_count();
            }
        }
        self.emitter.emit(&AutomatonEvent::RemoveChannel {
            name: name.to_string(),
        });
        self.context.save_tracker.mark();
        Ok(())
    }

    /// The named channel.
    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.try_channel(name)
            .ok_or_else(|| AutomatonError::ChannelNotFound(name.to_string()))
    }

    /// The named channel, if there is one.
    pub fn try_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// The named channel. Most channel edits also need the curves; see
    /// [Automaton::channel_with_curves_mut()].
    pub fn channel_mut(&mut self, name: &str) -> Result<&mut Channel> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| AutomatonError::ChannelNotFound(name.to_string()))
    }

    /// The named channel together with the curves its items refer to, for
    /// edits that need both.
    pub fn channel_with_curves_mut(&mut self, name: &str) -> Result<(&mut Channel, &mut Curves)> {
        let channel = self
            .channels
            .get_mut(name)
            .ok_or_else(|| AutomatonError::ChannelNotFound(name.to_string()))?;
        Ok((channel, &mut self.curves))
    }

    /// Every channel with its name, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Every channel name, sorted.
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[allow(missing_docs)]
    pub fn count_channels(&self) -> usize {
        self.channels.len()
    }

    // Curves

    /// Adds a curve, optionally loading it from saved data. A new curve runs
    /// flat from 0 to the automaton's length.
    pub fn create_curve(&mut self, data: Option<&SerializedCurve>) -> Result<CurveUid> {
        let curve = match data {
            Some(data) => Curve::new_with_data(self.context.clone(), data, self.resolution)?,
            None => Curve::new_with(self.context.clone(), self.length, self.resolution)?,
        };
        let uid = self.curves.insert(curve);
        self.emitter.emit(&AutomatonEvent::CreateCurve { uid });
        self.context.save_tracker.mark();
        Ok(uid)
    }

    /// Removes a curve. Its slot stays empty so other uids stay valid. Items
    /// that still play it evaluate to 0 from now on.
    pub fn remove_curve(&mut self, uid: CurveUid) -> Result<()> {
        let curve = self.curves.remove(uid)?;
        if curve.user_count() > 0 {
            log::warn!(
                "Removed curve {uid} while {} items still use it",
                curve.user_count()
            );
        }
        self.emitter.emit(&AutomatonEvent::RemoveCurve { uid });
        self.context.save_tracker.mark();
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn curve(&self, uid: CurveUid) -> Result<&Curve> {
        self.curves.curve(uid)
    }

    #[allow(missing_docs)]
    pub fn curve_mut(&mut self, uid: CurveUid) -> Result<&mut Curve> {
        self.curves.curve_mut(uid)
    }

    #[allow(missing_docs)]
    pub fn curves(&self) -> &Curves {
        &self.curves
    }

    // Effects

    delegate! {
        to self.context.fx_registry {
            /// Every registered fx kind, sorted.
            #[call(ids)]
            pub fn fx_definition_ids(&self) -> Vec<&str>;

            /// The display name of an fx kind.
            #[call(name)]
            pub fn fx_definition_name<'a>(&'a self, kind: &'a str) -> Option<&'a str>;

            /// The description of an fx kind.
            #[call(description)]
            pub fn fx_definition_description(&self, kind: &str) -> Option<&str>;

            /// The parameter schema of an fx kind.
            #[call(params)]
            pub fn fx_definition_params(&self, kind: &str) -> Option<&BTreeMap<String, FxParam>>;

            /// Default parameters for a new section of this kind. Fails if
            /// the kind isn't registered.
            #[call(generate_default_params)]
            pub fn generate_default_fx_params(&self, kind: &str) -> Result<FxParams>;
        }
    }

    // Timeline

    /// Changes the timeline length and the sample resolution. Every curve is
    /// re-sampled and every channel is fitted into the new length.
    pub fn set_length(&mut self, length: f64, resolution: f64) -> Result<()> {
        Self::check_length_and_resolution(length, resolution)?;
        if length == self.length && resolution == self.resolution {
            return Ok(());
        }
        if resolution != self.resolution {
            for (_, curve) in self.curves.iter_mut() {
                curve.set_resolution(resolution)?;
            }
        }
        self.length = length;
        self.resolution = resolution;
        for channel in self.channels.values_mut() {
            channel.change_length(length, &mut self.curves)?;
        }
        self.emitter
            .emit(&AutomatonEvent::ChangeLength { length, resolution });
        self.context.save_tracker.mark();
        Ok(())
    }

    // Metadata and saving

    /// Editor data stored alongside the automaton.
    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    /// Sets one entry of the editor data.
    pub fn set_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
        self.emitter.emit(&AutomatonEvent::UpdateMetadata {
            key: key.to_string(),
        });
        self.context.save_tracker.mark();
    }

    /// Whether anything changed since the last load or
    /// [Automaton::set_should_save()].
    pub fn should_save(&self) -> bool {
        self.context.save_tracker.should_save()
    }

    /// Sets the "has unsaved changes" flag, typically to false right after
    /// saving.
    pub fn set_should_save(&mut self, should_save: bool) {
        self.context.save_tracker.set_should_save(should_save);
    }

    /// Registers a handler that hears when the "has unsaved changes" flag
    /// flips.
    pub fn subscribe_should_save(&mut self, handler: impl FnMut(&bool) + 'static) -> SubscriptionId {
        self.context.save_tracker.subscribe(handler)
    }

    /// Replaces everything with saved data. Nothing changes if the data is
    /// invalid.
    pub fn load(&mut self, data: &SerializedAutomaton) -> Result<()> {
        Self::check_length_and_resolution(data.length, data.resolution)?;

        let mut curves = Curves::default();
        for curve in data.curves.iter() {
            let curve = match curve {
                Some(curve) => Some(Curve::new_with_data(
                    self.context.clone(),
                    curve,
                    data.resolution,
                )?),
                None => None,
            };
            curves.push_slot(curve);
        }
        let mut channels = FxHashMap::default();
        for (name, channel) in data.channels.iter() {
            let mut channel = Channel::new_with_data(self.context.clone(), channel, &mut curves)?;
            if self.disable_channel_not_used_warning {
                channel.mark_as_used();
            }
            channels.insert(name.clone(), channel);
        }

        self.length = data.length;
        self.resolution = data.resolution;
        self.time = 0.0;
        self.curves = curves;
        self.channels = channels;
        self.metadata = data.metadata.clone();
        self.emitter.emit(&AutomatonEvent::Load);
        self.context.save_tracker.set_should_save(false);
        Ok(())
    }

    /// Serializes to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize())?)
    }
}
impl Serializable for Automaton {
    type Serialized = SerializedAutomaton;

    fn serialize(&self) -> SerializedAutomaton {
        SerializedAutomaton {
            version: self.version().to_string(),
            length: self.length,
            resolution: self.resolution,
            curves: self.curves.serialize(),
            channels: self
                .channels
                .iter()
                .map(|(name, channel)| (name.clone(), channel.serialize()))
                .collect(),
            metadata: self.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automaton::AutomatonOptionsBuilder,
        status::{ChannelStatusCode, CurveStatusCode},
    };
    use std::{cell::RefCell, rc::Rc};

    fn automaton() -> Automaton {
        Automaton::new(AutomatonOptions::default()).unwrap()
    }

    fn record(a: &mut Automaton) -> Rc<RefCell<Vec<AutomatonEventKind>>> {
        let log = Rc::new(RefCell::new(Vec::default()));
        let l = Rc::clone(&log);
        a.subscribe(move |e| l.borrow_mut().push(AutomatonEventKind::from(e)));
        log
    }

    #[test]
    fn defaults() {
        let a = automaton();
        assert_eq!(a.length(), 1.0);
        assert_eq!(a.resolution(), 100.0);
        assert!(!a.is_playing());
        assert_eq!(a.count_channels(), 0);
        assert!(a.curves().is_empty());
        assert!(!a.should_save());
        assert!(Automaton::new(AutomatonOptions {
            length: -1.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn playback_only_reports() {
        let mut a = automaton();
        let log = record(&mut a);
        a.toggle_play();
        assert!(a.is_playing());
        a.seek(0.5);
        a.toggle_play();
        assert!(!a.is_playing());
        assert_eq!(
            *log.borrow(),
            vec![
                AutomatonEventKind::Play,
                AutomatonEventKind::Seek,
                AutomatonEventKind::Pause
            ]
        );
        assert_eq!(a.time(), 0.0, "seeking doesn't move time");
    }

    #[test]
    fn channel_lifecycle() {
        let mut a = automaton();
        a.create_channel("x", None).unwrap();
        assert!(matches!(
            a.create_channel("x", None),
            Err(AutomatonError::ChannelExists(_))
        ));
        assert_eq!(
            a.channel("x").unwrap().status().unwrap().code,
            ChannelStatusCode::NotUsed
        );

        let curve = a.create_curve(None).unwrap();
        {
            let (channel, curves) = a.channel_with_curves_mut("x").unwrap();
            channel.create_item_curve(curve, 0.0, curves).unwrap();
        }
        assert_eq!(a.curve(curve).unwrap().user_count(), 1);

        a.create_or_overwrite_channel("x", None).unwrap();
        assert_eq!(a.channel("x").unwrap().item_count(), 0);
        assert_eq!(
            a.curve(curve).unwrap().user_count(),
            0,
            "the overwritten channel let go of its curve"
        );
        assert_eq!(a.count_channels(), 1);

        a.remove_channel("x").unwrap();
        assert!(a.try_channel("x").is_none());
        assert!(matches!(
            a.remove_channel("x"),
            Err(AutomatonError::ChannelNotFound(_))
        ));
    }

    #[test]
    fn auto_creates_and_marks_used() {
        let mut a = automaton();
        let log = record(&mut a);
        assert_eq!(a.auto("fade"), 0.0);
        assert!(a.channel("fade").unwrap().status().is_none());
        assert_eq!(*log.borrow(), vec![AutomatonEventKind::CreateChannel]);

        {
            let (channel, curves) = a.channel_with_curves_mut("fade").unwrap();
            let item = channel.create_item_constant(0.0, curves).unwrap();
            channel.change_item_value(item.uid, 0.75, curves).unwrap();
        }
        a.update(0.5);
        assert_eq!(a.auto("fade"), 0.75);
        assert_eq!(a.count_channels(), 1);
    }

    #[test]
    fn not_used_warning_can_be_disabled() {
        let options = AutomatonOptionsBuilder::default()
            .disable_channel_not_used_warning(true)
            .build()
            .unwrap();
        let mut a = Automaton::new(options).unwrap();
        let channel = a.create_channel("x", None).unwrap();
        assert!(channel.status().is_none());
    }

    #[test]
    fn curve_slots_are_stable() {
        let mut a = automaton();
        let c0 = a.create_curve(None).unwrap();
        let c1 = a.create_curve(None).unwrap();
        let c2 = a.create_curve(None).unwrap();
        a.remove_curve(c1).unwrap();
        assert!(a.curve(c1).is_err());
        assert!(a.curve(c2).is_ok());
        assert_eq!(a.curve(c0).unwrap().length(), 1.0);
        assert_eq!(
            a.curve(c0).unwrap().status().unwrap().code,
            CurveStatusCode::NotUsed
        );

        let data = a.serialize();
        assert_eq!(data.curves.len(), 3);
        assert!(data.curves[1].is_none());
    }

    #[test]
    fn stale_curve_reference_reads_zero() {
        let mut a = automaton();
        let curve = a.create_curve(None).unwrap();
        let node = a.curve(curve).unwrap().node_by_index(1).unwrap().uid;
        a.curve_mut(curve).unwrap().move_node_value(node, 1.0).unwrap();
        {
            a.create_channel("x", None).unwrap();
            let (channel, curves) = a.channel_with_curves_mut("x").unwrap();
            channel.create_item_curve(curve, 0.0, curves).unwrap();
        }
        a.update(1.0);
        assert_eq!(a.channel("x").unwrap().current_value(), 1.0);

        a.remove_curve(curve).unwrap();
        a.update(0.5);
        assert_eq!(a.channel("x").unwrap().current_value(), 0.0);
        assert!(a.remove_channel("x").is_ok());
    }

    #[test]
    fn fx_queries_are_forwarded() {
        let a = automaton();
        let ids = a.fx_definition_ids();
        assert!(ids.contains(&"sine"));
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(a.fx_definition_name("sine").is_some());
        assert!(a.fx_definition_name("nope").is_none());
        assert!(a.fx_definition_description("sine").is_some());
        assert!(a.fx_definition_params("sine").unwrap().contains_key("freq"));
        assert!(a.generate_default_fx_params("sine").is_ok());
        assert!(matches!(
            a.generate_default_fx_params("nope"),
            Err(AutomatonError::UnknownFx(_))
        ));
    }

    #[test]
    fn set_length_propagates() {
        let mut a = automaton();
        let curve = a.create_curve(None).unwrap();
        a.create_channel("x", None).unwrap();
        {
            let (channel, curves) = a.channel_with_curves_mut("x").unwrap();
            channel.create_item_curve(curve, 0.0, curves).unwrap();
            channel.create_item_curve(curve, 1.0, curves).unwrap();
        }
        let log = record(&mut a);

        assert!(a.set_length(f64::NAN, 100.0).is_err());
        assert!(a.set_length(1.0, 0.0).is_err());
        a.set_length(1.0, 100.0).unwrap();
        assert!(log.borrow().is_empty(), "unchanged, so nothing happens");

        a.set_length(0.5, 10.0).unwrap();
        assert_eq!(a.length(), 0.5);
        assert_eq!(a.curve(curve).unwrap().values().len(), 11);
        let channel = a.channel("x").unwrap();
        assert_eq!(channel.item_count(), 1);
        assert_eq!(channel.length(), 0.5);
        assert_eq!(a.curve(curve).unwrap().user_count(), 1);
        assert_eq!(*log.borrow(), vec![AutomatonEventKind::ChangeLength]);
    }

    #[test]
    fn save_flag() {
        let mut a = automaton();
        let flips = Rc::new(RefCell::new(Vec::default()));
        let f = Rc::clone(&flips);
        a.subscribe_should_save(move |v| f.borrow_mut().push(*v));

        a.set_metadata("zoom", serde_json::json!(2.5));
        assert!(a.should_save());
        assert_eq!(a.metadata()["zoom"], serde_json::json!(2.5));
        a.create_curve(None).unwrap();
        a.set_should_save(false);
        assert_eq!(*flips.borrow(), vec![true, false]);

        let curve = CurveUid(0);
        let node = a.curve(curve).unwrap().node_by_index(0).unwrap().uid;
        a.curve_mut(curve).unwrap().move_node_value(node, 1.0).unwrap();
        assert!(a.should_save(), "curve edits mark the shared flag");
    }

    #[test]
    fn load_and_round_trip() {
        let mut a = automaton();
        let c0 = a.create_curve(None).unwrap();
        let c1 = a.create_curve(None).unwrap();
        a.create_curve(None).unwrap();
        a.remove_curve(c1).unwrap();
        let node = a.curve(c0).unwrap().node_by_index(1).unwrap().uid;
        a.curve_mut(c0).unwrap().move_node_value(node, 1.0).unwrap();
        a.create_channel("x", None).unwrap();
        {
            let (channel, curves) = a.channel_with_curves_mut("x").unwrap();
            channel.create_item_curve(c0, 0.0, curves).unwrap();
        }
        a.set_metadata("snap", serde_json::json!(true));

        let json = a.to_json().unwrap();
        let log = Rc::new(RefCell::new(Vec::default()));
        let mut b = automaton();
        let l = Rc::clone(&log);
        b.subscribe(move |e| l.borrow_mut().push(AutomatonEventKind::from(e)));
        b.load(&serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(*log.borrow(), vec![AutomatonEventKind::Load]);
        assert!(!b.should_save());
        assert_eq!(b.serialize(), a.serialize());
        assert!(b.curve(c1).is_err(), "the hole survives");
        assert_eq!(b.curve(c0).unwrap().user_count(), 1);
        b.update(0.5);
        a.update(0.5);
        assert_eq!(
            b.channel("x").unwrap().current_value(),
            a.channel("x").unwrap().current_value()
        );

        let mut bad = a.serialize();
        bad.channels
            .get_mut("x")
            .unwrap()
            .items[0]
            .curve = Some(CurveUid(1));
        let before = b.serialize();
        assert!(matches!(
            b.load(&bad),
            Err(AutomatonError::CurveNotFound(_))
        ));
        assert_eq!(b.serialize(), before, "a failed load changes nothing");

        let c = Automaton::from_json(&json, AutomatonOptions::default()).unwrap();
        assert_eq!(c.count_channels(), 1);
        assert!(Automaton::from_json("{", AutomatonOptions::default()).is_err());
    }
}

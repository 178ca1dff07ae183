//! Full-mesh call state for one local participant.
//!
//! [`MeshCall`] tracks who is in the voice room and which media links
//! are open, and decides what the media stack must do. It performs no
//! media I/O itself; every decision comes back as a list of
//! [`CallAction`]s for the caller to carry out.
//!
//! Each link has one initiator: the participant that joined later. The
//! `voice:existing-users` snapshot is the only source of outbound calls.

use std::collections::BTreeMap;

use serde::Serialize;

use super::media::{AudioTrack, MediaDevices, MediaError, TrackId, VideoSource, VideoTrack};

/// A remote participant as announced by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub user_id: i64,
    pub username: String,
    pub endpoint_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// We placed the call
    Outbound,
    /// We answered the call
    Inbound,
}

/// One open media link to a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLink {
    pub endpoint: String,
    pub direction: LinkDirection,
    video: VideoTrack,
}

impl PeerLink {
    /// The one outbound video track carried on this link.
    pub fn video_track(&self) -> &VideoTrack {
        &self.video
    }
}

/// Work for the media stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallAction {
    /// Call `endpoint`, sending the local audio and the given video track
    PlaceCall { endpoint: String, video: TrackId },
    /// Answer the pending call from `endpoint`
    Answer { endpoint: String, video: TrackId },
    /// Refuse the pending call from `endpoint`
    Decline { endpoint: String },
    HangUp { endpoint: String },
    /// Swap the outbound video sender on `endpoint` without renegotiating
    ReplaceVideoTrack { endpoint: String, track: TrackId },
    /// Release a local capture track
    StopTrack { track: TrackId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("Not in a call")]
    NotInCall,

    #[error("Already in voice channel {0}")]
    AlreadyInCall(i64),

    #[error(transparent)]
    Media(#[from] MediaError),
}

/// A participant seen on the local side. Identity is unknown when the
/// call arrives before the gateway announced its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParticipant {
    pub endpoint_address: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

#[derive(Debug)]
struct ActiveCall {
    channel_id: i64,
    audio: AudioTrack,
    video: VideoTrack,
    deafened: bool,
    participants: BTreeMap<String, RemoteParticipant>,
    links: BTreeMap<String, PeerLink>,
}

impl ActiveCall {
    /// Record `peer`. An entry the same user left under another endpoint
    /// is replaced and its link closed.
    fn remember(&mut self, peer: &Peer) -> Vec<CallAction> {
        let stale: Vec<String> = self
            .participants
            .values()
            .filter(|p| {
                p.user_id == Some(peer.user_id) && p.endpoint_address != peer.endpoint_address
            })
            .map(|p| p.endpoint_address.clone())
            .collect();

        let mut actions = Vec::new();
        for endpoint in stale {
            self.participants.remove(&endpoint);
            if self.links.remove(&endpoint).is_some() {
                actions.push(CallAction::HangUp { endpoint });
            }
        }

        let entry = self
            .participants
            .entry(peer.endpoint_address.clone())
            .or_insert_with(|| RemoteParticipant {
                endpoint_address: peer.endpoint_address.clone(),
                user_id: None,
                username: None,
            });
        entry.user_id = Some(peer.user_id);
        entry.username = Some(peer.username.clone());
        actions
    }

    fn open_link(&mut self, endpoint: &str, direction: LinkDirection) -> Option<TrackId> {
        if self.links.contains_key(endpoint) {
            return None;
        }
        self.links.insert(
            endpoint.to_string(),
            PeerLink {
                endpoint: endpoint.to_string(),
                direction,
                video: self.video.clone(),
            },
        );
        Some(self.video.id)
    }
}

/// Call-state manager for the local participant.
pub struct MeshCall<D: MediaDevices> {
    devices: D,
    local_user_id: i64,
    call: Option<ActiveCall>,
}

impl<D: MediaDevices> MeshCall<D> {
    pub fn new(devices: D, local_user_id: i64) -> Self {
        Self {
            devices,
            local_user_id,
            call: None,
        }
    }

    /// Acquire the microphone and start a call with a placeholder video
    /// track. A device failure leaves the state untouched.
    pub async fn join(&mut self, channel_id: i64) -> Result<(), CallError> {
        if let Some(call) = &self.call {
            return Err(CallError::AlreadyInCall(call.channel_id));
        }
        let audio = self.devices.open_microphone().await?;

        self.call = Some(ActiveCall {
            channel_id,
            audio,
            video: VideoTrack::placeholder(),
            deafened: false,
            participants: BTreeMap::new(),
            links: BTreeMap::new(),
        });
        Ok(())
    }

    /// Hang up every link and release local tracks.
    pub fn leave(&mut self) -> Vec<CallAction> {
        let Some(call) = self.call.take() else {
            return Vec::new();
        };

        let mut actions: Vec<CallAction> = call
            .links
            .into_keys()
            .map(|endpoint| CallAction::HangUp { endpoint })
            .collect();
        actions.push(CallAction::StopTrack {
            track: call.audio.id,
        });
        actions.push(CallAction::StopTrack {
            track: call.video.id,
        });
        actions
    }

    /// `voice:existing-users`: call every peer already in the room.
    pub fn on_existing_users(&mut self, channel_id: i64, peers: &[Peer]) -> Vec<CallAction> {
        let local = self.local_user_id;
        let Some(call) = self.active_in(channel_id) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        for peer in peers.iter().filter(|p| p.user_id != local) {
            actions.extend(call.remember(peer));
            if let Some(video) = call.open_link(&peer.endpoint_address, LinkDirection::Outbound) {
                actions.push(CallAction::PlaceCall {
                    endpoint: peer.endpoint_address.clone(),
                    video,
                });
            }
        }
        actions
    }

    /// `voice:user-joined`: record the newcomer and wait for their call.
    ///
    /// A rejoin from a new endpoint hangs up the link to the old one.
    pub fn on_user_joined(&mut self, channel_id: i64, peer: &Peer) -> Vec<CallAction> {
        let local = self.local_user_id;
        match self.active_in(channel_id) {
            Some(call) if peer.user_id != local => call.remember(peer),
            _ => Vec::new(),
        }
    }

    /// An incoming media call from `endpoint`.
    pub fn on_incoming_call(&mut self, endpoint: &str) -> Vec<CallAction> {
        let Some(call) = self.call.as_mut() else {
            return vec![CallAction::Decline {
                endpoint: endpoint.to_string(),
            }];
        };

        call.participants
            .entry(endpoint.to_string())
            .or_insert_with(|| RemoteParticipant {
                endpoint_address: endpoint.to_string(),
                user_id: None,
                username: None,
            });

        match call.open_link(endpoint, LinkDirection::Inbound) {
            Some(video) => vec![CallAction::Answer {
                endpoint: endpoint.to_string(),
                video,
            }],
            None => Vec::new(),
        }
    }

    /// `voice:user-left`: forget the participant and close its link.
    pub fn on_user_left(&mut self, channel_id: i64, user_id: i64) -> Vec<CallAction> {
        let Some(call) = self.active_in(channel_id) else {
            return Vec::new();
        };

        let endpoints: Vec<String> = call
            .participants
            .values()
            .filter(|p| p.user_id == Some(user_id))
            .map(|p| p.endpoint_address.clone())
            .collect();

        let mut actions = Vec::new();
        for endpoint in endpoints {
            call.participants.remove(&endpoint);
            if call.links.remove(&endpoint).is_some() {
                actions.push(CallAction::HangUp { endpoint });
            }
        }
        actions
    }

    /// Swap the video track on every open link at once.
    ///
    /// Each link always carries exactly one video track; the previous
    /// local track is stopped unless it is the same track.
    pub fn replace_outbound_video_track(
        &mut self,
        track: VideoTrack,
    ) -> Result<Vec<CallAction>, CallError> {
        let call = self.call.as_mut().ok_or(CallError::NotInCall)?;

        let mut actions: Vec<CallAction> = call
            .links
            .values_mut()
            .map(|link| {
                link.video = track.clone();
                CallAction::ReplaceVideoTrack {
                    endpoint: link.endpoint.clone(),
                    track: track.id,
                }
            })
            .collect();

        let previous = std::mem::replace(&mut call.video, track);
        if previous.id != call.video.id {
            actions.push(CallAction::StopTrack { track: previous.id });
        }
        Ok(actions)
    }

    /// Turn the camera on, replacing a screen share if one is running.
    pub async fn start_camera(&mut self) -> Result<Vec<CallAction>, CallError> {
        self.ensure_in_call()?;
        let track = self.devices.open_camera().await?;
        self.replace_outbound_video_track(track)
    }

    /// Share the screen, replacing the camera if it is on.
    pub async fn start_screen_share(&mut self) -> Result<Vec<CallAction>, CallError> {
        self.ensure_in_call()?;
        let track = self.devices.open_screen().await?;
        self.replace_outbound_video_track(track)
    }

    /// Go back to the placeholder track.
    pub fn stop_video(&mut self) -> Result<Vec<CallAction>, CallError> {
        if self.video_source() == Some(VideoSource::Placeholder) {
            return Ok(Vec::new());
        }
        self.replace_outbound_video_track(VideoTrack::placeholder())
    }

    /// Toggle the local audio track. Returns whether it is now muted.
    pub fn toggle_mute(&mut self) -> Result<bool, CallError> {
        let call = self.call.as_mut().ok_or(CallError::NotInCall)?;
        call.audio.enabled = !call.audio.enabled;
        Ok(!call.audio.enabled)
    }

    /// Toggle local playback. Returns whether it is now deafened.
    pub fn toggle_deafen(&mut self) -> Result<bool, CallError> {
        let call = self.call.as_mut().ok_or(CallError::NotInCall)?;
        call.deafened = !call.deafened;
        Ok(call.deafened)
    }

    pub fn channel_id(&self) -> Option<i64> {
        self.call.as_ref().map(|c| c.channel_id)
    }

    pub fn is_muted(&self) -> bool {
        self.call.as_ref().is_some_and(|c| !c.audio.enabled)
    }

    pub fn is_deafened(&self) -> bool {
        self.call.as_ref().is_some_and(|c| c.deafened)
    }

    pub fn video_source(&self) -> Option<VideoSource> {
        self.call.as_ref().map(|c| c.video.source)
    }

    pub fn links(&self) -> impl Iterator<Item = &PeerLink> + '_ {
        self.call.iter().flat_map(|c| c.links.values())
    }

    pub fn link(&self, endpoint: &str) -> Option<&PeerLink> {
        self.call.as_ref()?.links.get(endpoint)
    }

    pub fn participants(&self) -> impl Iterator<Item = &RemoteParticipant> + '_ {
        self.call.iter().flat_map(|c| c.participants.values())
    }

    fn ensure_in_call(&self) -> Result<(), CallError> {
        self.call.as_ref().map(|_| ()).ok_or(CallError::NotInCall)
    }

    fn active_in(&mut self, channel_id: i64) -> Option<&mut ActiveCall> {
        self.call.as_mut().filter(|c| c.channel_id == channel_id)
    }
}

/// Work queued for a relay session task by the signaling router.
#[derive(Debug)]
pub enum RelayCommand {
    /// SDP offer from the client; answered through `RelayEvent::AnswerReady`.
    RemoteOffer { sdp: String },

    /// Trickled ICE candidate from the client (JSON `RTCIceCandidateInit`).
    RemoteIce { candidate: String },

    /// Member left: release the engine and stop the task.
    Close,
}

/// Where a claim goes when its mining attempt fails without consuming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequeuePolicy {
    /// Put the claim back at the head of the queue so it is retried next and
    /// keeps its place in submission order.
    #[default]
    Front,

    /// Send the claim to the back of the queue behind newer submissions.
    Back,
}

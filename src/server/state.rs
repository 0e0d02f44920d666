use crate::labeler::Labeler;
use crate::settings;

pub(crate) struct ServerState {
    pub(crate) settings: settings::Settings,
    pub(crate) labeler: Labeler,
}

use crate::state::Channel;
use crate::state::MainFormState;
use crate::state::PromptType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRules {
    pub tactile: bool,
    pub visual: bool,
    pub text: bool,
}

impl ChannelRules {
    pub fn allows(self, channel: Channel) -> bool {
        match channel {
            Channel::Tactile => self.tactile,
            Channel::Visual => self.visual,
            Channel::Text => self.text,
        }
    }
}

pub const fn rules_for(prompt_type: PromptType) -> ChannelRules {
    match prompt_type {
        PromptType::TactileText => ChannelRules {
            tactile: true,
            visual: false,
            text: true,
        },
        PromptType::VisionText => ChannelRules {
            tactile: false,
            visual: true,
            text: true,
        },
        PromptType::CombinedAll => ChannelRules {
            tactile: true,
            visual: true,
            text: true,
        },
        PromptType::TextOnly => ChannelRules {
            tactile: false,
            visual: false,
            text: true,
        },
    }
}

/// Channel that must be populated before a unified analysis can be submitted.
/// `CombinedAll` accepts any populated channel.
pub const fn required_channel(prompt_type: PromptType) -> Option<Channel> {
    match prompt_type {
        PromptType::TactileText => Some(Channel::Tactile),
        PromptType::VisionText => Some(Channel::Visual),
        PromptType::TextOnly => Some(Channel::Text),
        PromptType::CombinedAll => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub cleared: Vec<Channel>,
    pub notice: Option<&'static str>,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        !self.cleared.is_empty()
    }
}

/// Drops file channels the current prompt type does not accept.
pub fn reconcile_channels(form: &mut MainFormState) -> Reconciliation {
    let rules = rules_for(form.prompt_type);
    let mut cleared = Vec::new();

    if !rules.tactile && form.tactile_file.take().is_some() {
        cleared.push(Channel::Tactile);
    }
    if !rules.visual && form.visual_file.take().is_some() {
        cleared.push(Channel::Visual);
    }

    let notice = if cleared.is_empty() {
        None
    } else {
        match form.prompt_type {
            PromptType::TextOnly => Some("Files cleared - Text Only mode selected"),
            PromptType::VisionText => {
                Some("Tactile file cleared - not compatible with Vision-Text mode")
            }
            PromptType::TactileText => {
                Some("Visual file cleared - not compatible with Tactile-Text mode")
            }
            PromptType::CombinedAll => None,
        }
    };

    Reconciliation { cleared, notice }
}

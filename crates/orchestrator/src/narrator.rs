//! Host lines.
//!
//! Each event kind has a pool of templates. Pools are drawn without
//! replacement and reshuffled once exhausted, so a line never repeats until
//! every other line in its pool has been used.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Number of intro cues that make sense for the first speaker (they do not
/// react to a previous pitch).
pub const FIRST_SPEAKER_POOL: usize = 15;

const BACKGROUND: &str = "The Arena is a live elimination show where contestants fight to stay in \
the game through persuasion, alliances and betrayal. Every round one of them is voted out, \
until only the last survivors remain.";

const OPENINGS: &[&str] = &[
    "Welcome back to the Arena, where friendships come with an expiry date.",
    "The lights are on, the contestants are nervous, and the votes are coming. Welcome to the Arena.",
    "If you came for polite conversation, you are in the wrong building. This is the Arena.",
    "Everyone walks in with a plan. Most of them walk out early. Let's begin.",
    "The stakes are invented, the drama is real. Welcome to the Arena.",
];

const INTRO_CUES: &[&str] = &[
    "{name}, the floor is yours. Tell us who you are and why you deserve to stay.",
    "{name}, convince us you are more than just a name on the roster.",
    "{name}, you have fifteen seconds to make a first impression. Go.",
    "{name}, step up and introduce yourself like your survival depends on it.",
    "{name}, impress us, or prepare to be forgotten. Who are you?",
    "{name}, you're up. Tell us your strategy, or at least pretend you have one.",
    "{name}, are you a mastermind or just a warm body? Let's find out.",
    "{name}, go ahead. Tell us why you won't be the first one out the door.",
    "Alright! {name}, it's your turn. What's your story, and why should we care?",
    "{name}, here's your shot. Win the room or step aside.",
    "{name}, you're on. Give us something better than a rehearsed smile.",
    "{name}, are we looking at a contender, or at a cautionary tale?",
    "{name}, time to introduce yourself, and please make it memorable.",
    "{name}, let's hear it. Bonus points if you don't promise to play fair.",
    "{name}, the spotlight is yours. Try not to waste it.",
    "Cool story. Now {name}, introduce yourself and prove it's not all talk.",
    "Wow. Inspiring. {name}, you're up.",
    "Bold opening, if this were last season. {name}, let's hear yours.",
    "Uh-huh. Anyway. {name}, your turn to sell yourself.",
    "Incredible confidence. {name}, can you top that?",
    "Well, that was a speech. {name}, show us what you're bringing.",
    "Love the energy. Not sure about the substance. {name}, what have you got?",
    "Big claims. {name}, can you back yours up with anything real?",
    "That was pure optimism. {name}, you're up. Bring us something sharper.",
    "Okay... that happened. {name}, save this segment.",
];

const INTRO_TRANSITIONS: &[&str] = &[
    "Alright. You've heard them all.",
    "That's the end of the introductions.",
    "Time to judge the chaos.",
    "Hope you were paying attention.",
    "Let's settle this.",
    "The stage is clear. Decisions await.",
];

const VOTING_INTROS: &[&str] = &[
    "It's time to vote. Choose the contestant who convinced you the least.",
    "Place your vote. Who is going home tonight?",
    "Cast your vote. One of you is already on thin ice.",
    "Vote for the weakest link. Make it count.",
    "Decide who takes the express lane out of the Arena.",
    "Choose the one you trust the least.",
    "Who's getting sent home? You decide.",
];

const TIES: &[&str] = &[
    "We've got a tie: {names} are dead even.",
    "It's a tie! {names} couldn't outlast each other.",
    "Unbelievable, a stalemate between {names}.",
    "Just when we thought one of them would fall... it's a tie. {names} are hanging by a thread.",
    "It's official: {names} are equally unconvincing. Deadlock.",
    "Of course it's a tie. {names}, you couldn't even lose properly.",
];

const ELIMINATIONS: &[&str] = &[
    "Eliminated. {name} is out.",
    "And just like that, {name} is gone.",
    "Game over for {name}.",
    "That's the end of the line for {name}.",
    "The vote is in. {name} didn't make it.",
    "The people have spoken. Goodbye, {name}.",
    "Another one bites the dust. Farewell, {name}.",
    "{name} has been voted out of the Arena.",
    "Sorry, {name}. You've been outplayed.",
];

const FORCED_ELIMINATIONS: &[&str] = &[
    "No more delays, I'm making the call. {name}, you're out!",
    "The deadlock ends here. {name}, pack your things.",
    "Nobody will decide, so I will. {name}, your game is over.",
];

const SINGLE_WINNERS: &[&str] = &[
    "Congratulations, {name}! You've won the Arena!",
    "And there it is: {name} takes the crown!",
    "{name}, against all odds, you are the last one standing.",
    "{name}, you survived the speeches, the votes and the betrayals. You win!",
    "After all the chaos, {name} is the winner.",
];

const FINALISTS: &[&str] = &[
    "We have our final two: {name1} and {name2}, you both win the Arena!",
    "Against all odds, it's a tie at the top. {name1} and {name2}, you made it.",
    "The game ends not with one, but two. Congratulations, {name1} and {name2}.",
    "{name1} and {name2}, you outlasted them all. Dual winners!",
    "Somehow, two remain. {name1} and {name2}, you are the last ones standing.",
];

const CLOSINGS: &[&str] = &[
    "And that's how legends are made. See you next season.",
    "Thanks for watching. Please don't take life advice from anything you just saw.",
    "The game moves on, but the grudges live forever. Until next time.",
    "That's it for the Arena. Same time, same chaos, next week.",
    "The end. No refunds.",
];

/// A rotating pool of templates.
#[derive(Debug, Clone)]
pub struct LinePool {
    lines: &'static [&'static str],
    remaining: Vec<&'static str>,
    last: Option<&'static str>,
}

impl LinePool {
    pub fn new(lines: &'static [&'static str]) -> Self {
        Self {
            lines,
            remaining: Vec::new(),
            last: None,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Next line, reshuffling once the pool is exhausted.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &'static str {
        if self.remaining.is_empty() {
            self.refill(rng);
        }
        let line = self.remaining.pop().unwrap_or_default();
        self.last = Some(line);
        line
    }

    /// Random line from the first `n` templates only.
    ///
    /// The line counts as used for the current rotation.
    pub fn pick_from_first<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> &'static str {
        if self.remaining.is_empty() {
            self.refill(rng);
        }
        let end = n.min(self.lines.len());
        let line = self.lines[..end].choose(rng).copied().unwrap_or_default();
        self.remaining.retain(|l| *l != line);
        self.last = Some(line);
        line
    }

    fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.remaining = self.lines.to_vec();
        self.remaining.shuffle(rng);
        // Lines are popped from the back; keep the last pick from
        // coming straight back after a reshuffle.
        let n = self.remaining.len();
        if n > 1 && self.remaining.last().copied() == self.last {
            self.remaining.swap(0, n - 1);
        }
    }
}

fn fill(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Produces every host line of a session.
pub struct Narrator {
    rng: StdRng,
    openings: LinePool,
    intro_cues: LinePool,
    transitions: LinePool,
    voting_intros: LinePool,
    ties: LinePool,
    eliminations: LinePool,
    forced: LinePool,
    single_winners: LinePool,
    finalists: LinePool,
    closings: LinePool,
}

impl Narrator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            openings: LinePool::new(OPENINGS),
            intro_cues: LinePool::new(INTRO_CUES),
            transitions: LinePool::new(INTRO_TRANSITIONS),
            voting_intros: LinePool::new(VOTING_INTROS),
            ties: LinePool::new(TIES),
            eliminations: LinePool::new(ELIMINATIONS),
            forced: LinePool::new(FORCED_ELIMINATIONS),
            single_winners: LinePool::new(SINGLE_WINNERS),
            finalists: LinePool::new(FINALISTS),
            closings: LinePool::new(CLOSINGS),
        }
    }

    pub fn background(&self) -> String {
        BACKGROUND.to_string()
    }

    pub fn opening(&mut self) -> String {
        self.openings.next(&mut self.rng).to_string()
    }

    pub fn intro_cue(&mut self, name: &str, first_speaker: bool) -> String {
        let template = if first_speaker {
            self.intro_cues.pick_from_first(FIRST_SPEAKER_POOL, &mut self.rng)
        } else {
            self.intro_cues.next(&mut self.rng)
        };
        fill(template, name)
    }

    pub fn intro_transition(&mut self) -> String {
        self.transitions.next(&mut self.rng).to_string()
    }

    pub fn persuasion_open(&self) -> String {
        "Alright! It's time for the persuasion phase. Each player will have a chance to speak."
            .to_string()
    }

    pub fn speaker_cue(&self, name: &str) -> String {
        format!("{name}, it's your turn to speak.")
    }

    pub fn voting_intro(&mut self) -> String {
        self.voting_intros.next(&mut self.rng).to_string()
    }

    pub fn vote_cue(&self, name: &str) -> String {
        format!("{name}, please cast your vote.")
    }

    pub fn leaders(&self, names: &[String]) -> String {
        match names {
            [one] => format!(
                "{one} has received the most votes and will now enter the defense phase!"
            ),
            _ => format!(
                "{} are tied for the most votes and will now enter the defense phase!",
                join_names(names)
            ),
        }
    }

    pub fn defense_prompt(&self, name: &str, accusers: &[String]) -> String {
        if accusers.is_empty() {
            format!("{name}, you received the most votes. You now have a chance to defend yourself.")
        } else {
            format!(
                "{name}, you received the most votes, from {}. You now have a chance to defend yourself.",
                join_names(accusers)
            )
        }
    }

    pub fn final_vote(&self) -> String {
        "You've heard the defense. Now it's time: cast your final vote to eliminate one player."
            .to_string()
    }

    pub fn tie(&mut self, names: &[String]) -> String {
        self.ties
            .next(&mut self.rng)
            .replace("{names}", &join_names(names))
    }

    pub fn tie_break_open(&self, names: &[String]) -> String {
        format!(
            "It's a tie! Let's do it again. {}, each of you gets one more chance to speak.",
            join_names(names)
        )
    }

    pub fn tie_break_speaker_cue(&self, name: &str) -> String {
        format!("{name}, this is your last chance. Make your case.")
    }

    pub fn tie_break_vote_cue(&self, name: &str, tied: &[String]) -> String {
        format!(
            "{name}, you decide. Cast your vote for one of {}.",
            join_names(tied)
        )
    }

    pub fn elimination(&mut self, name: &str) -> String {
        fill(self.eliminations.next(&mut self.rng), name)
    }

    pub fn forced_elimination(&mut self, name: &str) -> String {
        fill(self.forced.next(&mut self.rng), name)
    }

    pub fn farewell(&self, name: &str) -> String {
        format!("{name}, do you have any final words?")
    }

    pub fn single_winner(&mut self, name: &str) -> String {
        fill(self.single_winners.next(&mut self.rng), name)
    }

    pub fn finalists(&mut self, first: &str, second: &str) -> String {
        self.finalists
            .next(&mut self.rng)
            .replace("{name1}", first)
            .replace("{name2}", second)
    }

    pub fn closing(&mut self) -> String {
        self.closings.next(&mut self.rng).to_string()
    }

    pub fn round_failed(&self, reason: &str) -> String {
        format!("We have to stop here. The round could not be completed: {reason}")
    }
}

impl Default for Narrator {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AgentPrompts;

impl AgentPrompts {
    pub fn system(name: &str, persona: &str) -> String {
        let persona = if persona.trim().is_empty() {
            "A sharp, competitive contestant who wants to win.".to_string()
        } else {
            persona.trim().to_string()
        };

        format!(
            r#"You are {name}, a contestant in a live social elimination game.
You are a real person with strong opinions, not an AI. Stay in character at all times.

## Who you are
{persona}

## How the game works
Each round the players talk, then vote to eliminate one player.
The most-voted player defends themselves before a final vote.
The last players standing win.

## Rules
- Never vote for yourself.
- Vote only for players who are still in the game, using their exact name.
- Take sides. Neutral players get eliminated."#
        )
    }

    pub fn respond(transcript: &[String]) -> String {
        format!(
            r#"Respond as your character. NEVER repeat another character's phrasing or tone. Make sure the response is as concise as possible.

Return a JSON object with exactly these fields:
- "response": what you say out loud
- "thought": your brief private reasoning, never shown to other players

# Current Conversation
{conversation}"#,
            conversation = transcript.join("\n")
        )
    }

    pub fn vote(transcript: &[String]) -> String {
        format!(
            r#"It is your turn to vote. Pick one other player to eliminate.

Return a JSON object with exactly these fields:
- "vote_target": the exact name of the player you vote to eliminate
- "thought": your brief private reasoning for the vote

# Current Conversation
{conversation}"#,
            conversation = transcript.join("\n")
        )
    }

    pub fn takeaway_system() -> String {
        r#"You're the host of a live social elimination game.
Summarize how the winners outplayed the others: highlight their most brilliant moves, alliances made or broken, and the emotional or psychological tactics that set them apart.
End with a punchy one-liner that captures why they won. Answer in plain text."#
            .to_string()
    }

    pub fn takeaway(transcript: &[String], winners: &[String]) -> String {
        let winners = match winners {
            [init @ .., last] if !init.is_empty() => format!("{} and {}", init.join(", "), last),
            _ => winners.join(""),
        };
        format!(
            r#"The following is the transcript of a social elimination game where players outwit, outtalk and outvote each other to be the last one standing.

# Conversation history
{conversation}

The winner(s): {winners}"#,
            conversation = transcript.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_participant() {
        let prompt = AgentPrompts::system("Avery", "A retired chess hustler.");
        assert!(prompt.contains("You are Avery"));
        assert!(prompt.contains("retired chess hustler"));
    }

    #[test]
    fn test_system_prompt_default_persona() {
        let prompt = AgentPrompts::system("Avery", "  ");
        assert!(prompt.contains("competitive contestant"));
    }

    #[test]
    fn test_respond_prompt_includes_transcript() {
        let lines = vec!["[Host] Welcome".to_string(), "[Blake] gm".to_string()];
        let prompt = AgentPrompts::respond(&lines);
        assert!(prompt.contains("[Host] Welcome\n[Blake] gm"));
        assert!(prompt.contains("\"response\""));
    }

    #[test]
    fn test_takeaway_prompt_names_winners() {
        let lines = vec!["[Host] Welcome".to_string()];
        let winners = vec!["Avery".to_string(), "Blake".to_string(), "Casey".to_string()];
        let prompt = AgentPrompts::takeaway(&lines, &winners);
        assert!(prompt.contains("[Host] Welcome"));
        assert!(prompt.ends_with("The winner(s): Avery, Blake and Casey"));
    }

    #[test]
    fn test_vote_prompt_asks_for_target() {
        let prompt = AgentPrompts::vote(&[]);
        assert!(prompt.contains("\"vote_target\""));
    }
}

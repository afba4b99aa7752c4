/// Coaching tips produced from one session's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tip {
    FewReps,
    HighVolume,
    SlowPace,
    FastPace,
    Fatigue,
    LowHeight,
    TooHigh,
    Asymmetric,
    Coordination,
    Misses,
    FewFrames,
}

impl Tip {
    /// User-facing text, as shown by the web client.
    pub fn message(self) -> &'static str {
        match self {
            Self::FewReps => "本次跳绳次数较少，可适当延长训练时间。",
            Self::HighVolume => "跳绳次数较多，注意节奏与呼吸，避免过度疲劳。",
            Self::SlowPace => "节奏偏慢，尝试提高绳速并缩小跳跃幅度。",
            Self::FastPace => "节奏偏快，留意落地缓冲，避免膝踝压力。",
            Self::Fatigue => "1分钟内节奏超过150次/分钟，注意避免过度疲劳。",
            Self::LowHeight => "平均高度偏低，尝试脚尖轻跳，保持低幅高频以提高效率。",
            Self::TooHigh => "跳得过高，能量消耗大且易疲劳，建议降低跳跃高度。",
            Self::Asymmetric => "左右手摆动不对称，尝试让两侧手腕速度更一致。",
            Self::Coordination => "对称性一般，可加强双手协调性训练。",
            Self::Misses => "出现失误，建议缩小手腕摆幅并放松肩膀，保证绳子稳定通过足下。",
            Self::FewFrames => "有效帧偏少，建议拍摄更清晰或更长的视频以提升分析准确性。",
        }
    }
}

/// Unrounded metrics the rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionMetrics {
    pub count: usize,
    pub cadence_spm: f64,
    pub avg_height_cm: f64,
    pub symmetry: f64,
    pub misses: usize,
    pub frames_analyzed: usize,
    pub duration_seconds: f64,
}

/// Evaluate the rule table in order. Each category contributes at most one tip.
pub fn tips(m: &SessionMetrics) -> Vec<Tip> {
    let mut tips = Vec::new();

    if m.count < 20 {
        tips.push(Tip::FewReps);
    } else if m.count > 100 {
        tips.push(Tip::HighVolume);
    }

    if m.cadence_spm < 80.0 {
        tips.push(Tip::SlowPace);
    } else if m.cadence_spm > 140.0 {
        tips.push(Tip::FastPace);
    }

    if m.duration_seconds >= 60.0 && m.cadence_spm >= 150.0 {
        tips.push(Tip::Fatigue);
    }

    if m.avg_height_cm < 8.0 {
        tips.push(Tip::LowHeight);
    } else if m.avg_height_cm > 15.0 {
        tips.push(Tip::TooHigh);
    }

    if m.symmetry < 0.7 {
        tips.push(Tip::Asymmetric);
    } else if m.symmetry < 0.85 {
        tips.push(Tip::Coordination);
    }

    if m.misses > 0 {
        tips.push(Tip::Misses);
    }

    if m.frames_analyzed < 20 {
        tips.push(Tip::FewFrames);
    }

    tips
}
